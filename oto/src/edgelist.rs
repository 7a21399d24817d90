//! Edge-list file formats shared with the sibling generator tools.
//!
//! Two interchange formats:
//!
//! - **Binary**: `u32` vertex count, `u32` edge count, then one packed `u32` word per edge with
//!   the source in the high 16 bits and the destination in the low 16 bits. Host-native
//!   endianness; the format is a scratch exchange between tools on one machine, not an archive
//!   format. Vertex ids must fit in 16 bits.
//! - **Text**: a `V=<int>` line followed by an `E={u>v,..}` line, where `u>v` is the directed
//!   edge `u -> v`.
//!
//! Readers raise [`Error::CorruptInput`] on truncated or malformed input; writers raise
//! [`Error::InvalidArgument`] when a vertex id cannot be packed.

use std::io::{BufRead, Read, Write};

use oto_graph::{Edge, Vertex};

use crate::Error;

/// Largest vertex count the packed binary format can express.
pub const BINARY_VERTEX_CAP: u32 = 1 << 16;

fn read_word(reader: &mut impl Read) -> Result<u32, Error> {
  let mut buf = [0u8; 4];
  reader.read_exact(&mut buf).map_err(|err| {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
      Error::CorruptInput("binary edge list is truncated".into())
    } else {
      Error::Io(err)
    }
  })?;
  Ok(u32::from_ne_bytes(buf))
}

/// Write `edges` over `v` vertices in the packed binary format.
pub fn write_binary(writer: &mut impl Write, v: u32, edges: &[Edge]) -> Result<(), Error> {
  if v >= BINARY_VERTEX_CAP {
    return Err(Error::InvalidArgument(format!(
      "{v} vertices cannot be packed into 16-bit ids"
    )));
  }
  writer.write_all(&v.to_ne_bytes())?;
  writer.write_all(&(edges.len() as u32).to_ne_bytes())?;
  for &(tail, head) in edges {
    if tail >= v || head >= v {
      return Err(Error::InvalidArgument(format!(
        "edge ({tail}, {head}) is out of range for {v} vertices"
      )));
    }
    let word = (tail << 16) | (head & 0xFFFF);
    writer.write_all(&word.to_ne_bytes())?;
  }
  Ok(())
}

/// Read a packed binary edge list, returning the vertex count and the edges.
pub fn read_binary(reader: &mut impl Read) -> Result<(u32, Vec<Edge>), Error> {
  let v = read_word(reader)?;
  let e = read_word(reader)?;
  let mut edges = Vec::with_capacity(e as usize);
  for _ in 0..e {
    let word = read_word(reader)?;
    let tail = word >> 16;
    let head = word & 0xFFFF;
    edges.push((tail as Vertex, head as Vertex));
  }
  Ok((v, edges))
}

/// Write `edges` over `v` vertices in the text format.
pub fn write_text(writer: &mut impl Write, v: u32, edges: &[Edge]) -> Result<(), Error> {
  writeln!(writer, "V={v}")?;
  write!(writer, "E={{")?;
  for (i, &(tail, head)) in edges.iter().enumerate() {
    if i != 0 {
      write!(writer, ",")?;
    }
    write!(writer, "{tail}>{head}")?;
  }
  writeln!(writer, "}}")?;
  Ok(())
}

/// Read a text edge list, returning the vertex count and the edges.
pub fn read_text(reader: &mut impl BufRead) -> Result<(u32, Vec<Edge>), Error> {
  let mut line = String::new();
  reader.read_line(&mut line)?;
  let v = line
    .trim_end()
    .strip_prefix("V=")
    .and_then(|value| value.parse::<u32>().ok())
    .ok_or_else(|| Error::CorruptInput(format!("expected a V=<int> line, found {line:?}")))?;

  line.clear();
  reader.read_line(&mut line)?;
  let body = line
    .trim_end()
    .strip_prefix("E={")
    .and_then(|rest| rest.strip_suffix('}'))
    .ok_or_else(|| Error::CorruptInput(format!("expected an E={{..}} line, found {line:?}")))?;

  let mut edges = Vec::new();
  if !body.is_empty() {
    for entry in body.split(',') {
      let (tail, head) = entry
        .split_once('>')
        .and_then(|(t, h)| Some((t.parse::<Vertex>().ok()?, h.parse::<Vertex>().ok()?)))
        .ok_or_else(|| Error::CorruptInput(format!("malformed edge entry {entry:?}")))?;
      edges.push((tail, head));
    }
  }
  Ok((v, edges))
}
