//! Arithmetic for the basic opcodes.
//!
//! Each function takes the values of operands a and b and returns the
//! 16-bit result together with the new value of the overflow register.
//! Shift amounts are not masked: shifting by 16 or more moves every bit
//! out of the result word.

/// `a + b`. O is 1 when the sum does not fit in 16 bits.
pub fn add(a: u16, b: u16) -> (u16, u16) {
    let (sum, carry) = a.overflowing_add(b);
    (sum, carry as u16)
}

/// `a - b`. O is 0xFFFF when the difference is negative.
pub fn sub(a: u16, b: u16) -> (u16, u16) {
    let (diff, borrow) = a.overflowing_sub(b);
    (diff, if borrow { 0xFFFF } else { 0 })
}

/// `a * b`. O is the high word of the 32-bit product.
pub fn mul(a: u16, b: u16) -> (u16, u16) {
    let product = a as u32 * b as u32;
    (product as u16, (product >> 16) as u16)
}

/// `a / b`. O is `(a << 16) / b`, the fractional part of the quotient.
/// Division by zero yields 0 with O = 0.
pub fn div(a: u16, b: u16) -> (u16, u16) {
    if b == 0 {
        return (0, 0);
    }
    let frac = ((a as u32) << 16) / b as u32;
    (a / b, frac as u16)
}

/// `a % b`, 0 when b is zero. O is not affected.
pub fn rem(a: u16, b: u16) -> u16 {
    a.checked_rem(b).unwrap_or(0)
}

/// `a << b`. O receives the bits shifted past bit 15.
pub fn shl(a: u16, b: u16) -> (u16, u16) {
    let wide = (a as u64).checked_shl(b as u32).unwrap_or(0);
    (wide as u16, (wide >> 16) as u16)
}

/// `a >> b`. O receives the bits shifted below bit 0, left aligned.
pub fn shr(a: u16, b: u16) -> (u16, u16) {
    let wide = ((a as u64) << 16).checked_shr(b as u32).unwrap_or(0);
    ((wide >> 16) as u16, wide as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_carry() {
        assert_eq!(add(0x0001, 0x0002), (0x0003, 0));
        assert_eq!(add(0xFFFF, 0x0001), (0x0000, 1));
        assert_eq!(add(0xFFFF, 0xFFFF), (0xFFFE, 1));
        assert_eq!(add(0x8000, 0x7FFF), (0xFFFF, 0));
    }

    #[test]
    fn test_sub_borrow() {
        assert_eq!(sub(0x0005, 0x0003), (0x0002, 0));
        assert_eq!(sub(0x0003, 0x0003), (0x0000, 0));
        assert_eq!(sub(0x0000, 0x0001), (0xFFFF, 0xFFFF));
        assert_eq!(sub(0x0003, 0xFFFF), (0x0004, 0xFFFF));
    }

    #[test]
    fn test_mul_high_word() {
        assert_eq!(mul(0x0010, 0x0010), (0x0100, 0));
        assert_eq!(mul(0xFFFF, 0xFFFF), (0x0001, 0xFFFE));
        assert_eq!(mul(0x8000, 0x0002), (0x0000, 0x0001));
    }

    #[test]
    fn test_div() {
        assert_eq!(div(0x0007, 0x0002), (0x0003, 0x8000));
        assert_eq!(div(0x0006, 0x0003), (0x0002, 0x0000));
        assert_eq!(div(0x1234, 0x0000), (0, 0));
    }

    #[test]
    fn test_rem() {
        assert_eq!(rem(7, 3), 1);
        assert_eq!(rem(7, 0), 0);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shl(0x8001, 1), (0x0002, 0x0001));
        assert_eq!(shl(0x00FF, 8), (0xFF00, 0x0000));
        assert_eq!(shl(0x1234, 16), (0x0000, 0x1234));
        assert_eq!(shl(0xFFFF, 0xFFFF), (0, 0));

        assert_eq!(shr(0x8001, 1), (0x4000, 0x8000));
        assert_eq!(shr(0x1234, 16), (0x0000, 0x1234));
        assert_eq!(shr(0xFFFF, 40), (0, 0));
    }
}
