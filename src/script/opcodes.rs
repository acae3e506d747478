//! Opcode constants used by the standard patterns.

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// `OP_1`..`OP_16` for 1..=16
pub fn small_int_opcode(n: usize) -> Option<u8> {
    (1..=16).contains(&n).then(|| OP_1 + (n as u8) - 1)
}

/// Inverse of [`small_int_opcode`]
pub fn small_int_value(opcode: u8) -> Option<usize> {
    (OP_1..=OP_16).contains(&opcode).then(|| (opcode - OP_1 + 1) as usize)
}
