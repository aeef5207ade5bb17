//! Support utilities for the eCash herald engine.
//!
//! Everything in this crate is a pure function over hex strings or raw
//! script bytes: a cursor with script push-data semantics, output-script
//! template classification, cashaddr encoding, and an opcode iterator used
//! to inspect unlocking scripts. Message semantics belong to the root crate.

pub mod address;
pub mod cursor;
pub mod script;

pub use address::{encode_cashaddr, script_to_address, AddressType};
pub use cursor::{CursorError, HexCursor};
pub use script::{
    classify_output_script, is_op_return, ScriptError, ScriptOp, ScriptOps, ScriptVariant,
};
