//! Contract ABI parsing and constructor-argument encoding.
//!
//! Only what deployment needs: parse the ABI JSON, locate the constructor,
//! and encode its arguments from string form. Supported parameter types are
//! `string`, `uint256`, `address`, and `bool`.

use serde::Deserialize;

use crate::chain::types::Address;
use crate::types::{ContracterError, Result};

/// One entry of a contract ABI definition.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
}

/// A named, typed ABI parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A parsed contract ABI.
#[derive(Debug, Clone)]
pub struct Abi {
    entries: Vec<AbiEntry>,
}

impl Abi {
    /// Parse an ABI JSON array. Malformed JSON is a configuration error.
    pub fn parse(json: &str) -> Result<Self> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)
            .map_err(|e| ContracterError::Config(format!("invalid contract ABI: {}", e)))?;
        Ok(Abi { entries })
    }

    /// The constructor's parameter list; empty when the ABI declares none.
    pub fn constructor_params(&self) -> &[AbiParam] {
        self.entries
            .iter()
            .find(|e| e.kind == "constructor")
            .map(|e| e.inputs.as_slice())
            .unwrap_or(&[])
    }

    /// Encode constructor arguments given as strings, in ABI order.
    ///
    /// The result is what gets appended to the contract bytecode in the
    /// deployment payload.
    pub fn encode_constructor_args(&self, args: &[String]) -> Result<Vec<u8>> {
        let params = self.constructor_params();
        if params.len() != args.len() {
            return Err(ContracterError::Validation(format!(
                "constructor expects {} argument(s), got {}",
                params.len(),
                args.len()
            )));
        }

        // Head/tail layout: static values inline, dynamic values as offsets
        // into a tail section that follows all heads.
        let mut heads: Vec<HeadSlot> = Vec::with_capacity(params.len());
        let mut tail: Vec<u8> = Vec::new();
        let head_len = 32 * params.len();

        for (param, arg) in params.iter().zip(args) {
            match param.kind.as_str() {
                "string" => {
                    heads.push(HeadSlot::Offset(head_len + tail.len()));
                    tail.extend_from_slice(&encode_uint_word(arg.len() as u128));
                    tail.extend_from_slice(arg.as_bytes());
                    let padding = (32 - arg.len() % 32) % 32;
                    tail.extend(std::iter::repeat(0u8).take(padding));
                }
                "uint256" => {
                    let value: u128 = arg.parse().map_err(|_| {
                        ContracterError::Validation(format!(
                            "argument '{}' is not a valid uint256",
                            arg
                        ))
                    })?;
                    heads.push(HeadSlot::Word(encode_uint_word(value)));
                }
                "address" => {
                    let addr: Address = arg.parse()?;
                    let mut word = [0u8; 32];
                    word[12..].copy_from_slice(addr.as_bytes());
                    heads.push(HeadSlot::Word(word));
                }
                "bool" => {
                    let value = match arg.as_str() {
                        "true" => 1u128,
                        "false" => 0u128,
                        _ => {
                            return Err(ContracterError::Validation(format!(
                                "argument '{}' is not a valid bool",
                                arg
                            )))
                        }
                    };
                    heads.push(HeadSlot::Word(encode_uint_word(value)));
                }
                other => {
                    return Err(ContracterError::Config(format!(
                        "unsupported constructor parameter type '{}'",
                        other
                    )))
                }
            }
        }

        let mut out = Vec::with_capacity(head_len + tail.len());
        for head in heads {
            match head {
                HeadSlot::Word(word) => out.extend_from_slice(&word),
                HeadSlot::Offset(offset) => {
                    out.extend_from_slice(&encode_uint_word(offset as u128))
                }
            }
        }
        out.extend_from_slice(&tail);
        Ok(out)
    }
}

enum HeadSlot {
    Word([u8; 32]),
    Offset(usize),
}

fn encode_uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}
