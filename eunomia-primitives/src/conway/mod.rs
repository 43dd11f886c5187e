//! Conway-era domain objects: value and assets, certificates, governance,
//! transaction assembly and the script-data hash.

mod certs;
mod governance;
mod script_data;
mod tx;
mod value;

pub use certs::*;
pub use governance::*;
pub use script_data::*;
pub use tx::*;
pub use value::*;

pub use crate::scripts::{Language, NativeScript, PlutusScript, Script};
