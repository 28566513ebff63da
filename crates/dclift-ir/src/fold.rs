//! Constant folding for integer operations on literal operands.
//!
//! Constants are stored as `u128` masked to their type's width, so every
//! helper takes the width explicitly.

use crate::op::{BinOp, CastOp, ICmpPred};

/// Keep the low `bits` bits of `value`.
pub const fn mask(value: u128, bits: u32) -> u128 {
    if bits >= 128 {
        value
    } else {
        value & ((1u128 << bits) - 1)
    }
}

/// Interpret the low `bits` bits of `value` as a signed integer.
pub const fn sign_extend(value: u128, bits: u32) -> i128 {
    if bits == 0 {
        return 0;
    }
    if bits >= 128 {
        return value as i128;
    }
    let shift = 128 - bits;
    ((value << shift) as i128) >> shift
}

/// Fold an integer binary operation. Returns `None` when the result is
/// poison or undefined (oversized shift, division by zero, signed overflow
/// in division) so the operation is emitted instead.
pub fn fold_binary(op: BinOp, lhs: u128, rhs: u128, bits: u32) -> Option<u128> {
    if bits == 0 || bits > 128 {
        return None;
    }
    let (a, b) = (mask(lhs, bits), mask(rhs, bits));
    let (sa, sb) = (sign_extend(a, bits), sign_extend(b, bits));
    let signed_min = sign_extend(1u128 << (bits - 1), bits);
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::UDiv if b != 0 => a / b,
        BinOp::URem if b != 0 => a % b,
        BinOp::SDiv if b != 0 && !(sa == signed_min && sb == -1) => sa.wrapping_div(sb) as u128,
        BinOp::SRem if b != 0 && !(sa == signed_min && sb == -1) => sa.wrapping_rem(sb) as u128,
        BinOp::Shl if b < u128::from(bits) => a << b,
        BinOp::LShr if b < u128::from(bits) => a >> b,
        BinOp::AShr if b < u128::from(bits) => (sa >> b) as u128,
        _ => return None,
    };
    Some(mask(result, bits))
}

/// Fold an integer-to-integer cast.
pub fn fold_cast(op: CastOp, value: u128, from_bits: u32, to_bits: u32) -> Option<u128> {
    if from_bits > 128 || to_bits > 128 {
        return None;
    }
    match op {
        CastOp::Trunc | CastOp::ZExt => Some(mask(value, to_bits)),
        CastOp::SExt => Some(mask(sign_extend(value, from_bits) as u128, to_bits)),
        CastOp::BitCast if from_bits == to_bits => Some(value),
        _ => None,
    }
}

/// Fold an integer comparison into an `i1`.
pub fn fold_icmp(pred: ICmpPred, lhs: u128, rhs: u128, bits: u32) -> u128 {
    let (a, b) = (mask(lhs, bits), mask(rhs, bits));
    let (sa, sb) = (sign_extend(a, bits), sign_extend(b, bits));
    let holds = match pred {
        ICmpPred::Eq => a == b,
        ICmpPred::Ne => a != b,
        ICmpPred::Ugt => a > b,
        ICmpPred::Uge => a >= b,
        ICmpPred::Ult => a < b,
        ICmpPred::Ule => a <= b,
        ICmpPred::Sgt => sa > sb,
        ICmpPred::Sge => sa >= sb,
        ICmpPred::Slt => sa < sb,
        ICmpPred::Sle => sa <= sb,
    };
    u128::from(holds)
}
