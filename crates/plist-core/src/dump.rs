//! Debug rendering of a property list tree.
//!
//! One line per node, `kind` or `kind=value`, with container children
//! indented one step deeper. Data payloads render as a classic hex dump.
//! The output is for humans and logs; it is not a round-trip format.

use std::io::{self, Write};

use crate::tree::{NodeId, Payload, Tree};

/// Spaces per indentation level.
const INDENT: usize = 8;

/// Bytes per hex dump row.
const HEX_ROW: usize = 16;

/// Hex dump with a decimal offset prefix, sixteen bytes per row, and a
/// printable-ASCII column at the end.
fn dump_data<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    for (row, chunk) in bytes.chunks(HEX_ROW).enumerate() {
        write!(out, "{}:\t", row * HEX_ROW)?;
        for b in chunk {
            write!(out, "{:02x} ", b)?;
        }
        let pad = (1 + HEX_ROW - chunk.len()) * 3;
        write!(out, "{:pad$}", "")?;
        for &b in chunk {
            let ch = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            };
            write!(out, "{}", ch)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Write an indented rendering of the subtree rooted at `node` to `out`.
///
/// The walk is iterative; a key's value prints at the key's own indent,
/// matching how an entry reads as one logical line pair.
pub fn dump<W: Write>(tree: &Tree, node: NodeId, out: &mut W) -> io::Result<()> {
    let mut pending = vec![(node, 0usize)];
    while let Some((id, depth)) = pending.pop() {
        let Some(payload) = tree.payload(id) else {
            continue;
        };
        write!(out, "{:width$}", "", width = depth * INDENT)?;
        match payload {
            Payload::Dict { keys } => {
                writeln!(out, "dict")?;
                pending.extend(keys.iter().rev().map(|&k| (k, depth + 1)));
            }
            Payload::Key { name, value } => {
                writeln!(out, "key={}", name)?;
                if let Some(v) = value {
                    pending.push((*v, depth));
                }
            }
            Payload::Array { elems } => {
                writeln!(out, "array")?;
                pending.extend(elems.iter().rev().map(|&e| (e, depth + 1)));
            }
            Payload::Data(bytes) => {
                writeln!(out, "data")?;
                dump_data(out, bytes)?;
            }
            Payload::Date(when) => {
                writeln!(out, "date={}", when.format("%Y-%m-%dT%H:%M:%S%z"))?;
            }
            Payload::String(text) => writeln!(out, "string={}", text)?,
            Payload::Integer(v) => writeln!(out, "integer={}", v)?,
            Payload::Real(v) => writeln!(out, "real={:.6}", v)?,
            Payload::Boolean(v) => {
                writeln!(out, "boolean={}", if *v { "true" } else { "false" })?;
            }
        }
    }
    Ok(())
}
