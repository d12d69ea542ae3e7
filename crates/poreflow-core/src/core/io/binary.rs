//! Little-endian primitives shared by the network and result formats.
//!
//! Every fixed-width field is written in little-endian byte order, counts are `i32` and
//! always precede the records they size, and strings are a `u32` byte length followed by
//! UTF-8 bytes.

use crate::core::models::ids::{PoreId, ThroatId};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, ErrorKind, Read, Write};

pub const MAGIC_LEN: usize = 8;

/// Upper bound on a persisted string, guarding against reading garbage as a length.
const MAX_STRING_LEN: u32 = 4096;

#[inline]
pub fn is_truncation(err: &io::Error) -> bool {
    err.kind() == ErrorKind::UnexpectedEof
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, message)
}

/// Outcome of comparing the leading bytes of a stream against a magic token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicCheck {
    Exact,
    /// The token was found after a single stray control byte.
    ControlPrefixed(u8),
    Mismatch(Vec<u8>),
}

/// A repeated section that may have been cut short by the end of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
    pub value: T,
    pub complete: bool,
}

pub struct BinaryWriter<W: Write> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.inner.write_all(&[u8::from(value)])
    }

    pub fn write_count(&mut self, count: usize) -> io::Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| invalid_data(format!("count {} exceeds format limit", count)))?;
        self.write_i32(count)
    }

    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        let len = u32::try_from(value.len())
            .ok()
            .filter(|&l| l <= MAX_STRING_LEN)
            .ok_or_else(|| invalid_data(format!("string of {} bytes is too long", value.len())))?;
        self.write_u32(len)?;
        self.inner.write_all(value.as_bytes())
    }

    pub fn write_pressure_map(&mut self, map: &BTreeMap<PoreId, f64>) -> io::Result<()> {
        self.write_count(map.len())?;
        for (id, value) in map {
            self.write_i32(id.0)?;
            self.write_f64(*value)?;
        }
        Ok(())
    }

    pub fn write_flow_map(&mut self, map: &BTreeMap<ThroatId, f64>) -> io::Result<()> {
        self.write_count(map.len())?;
        for (id, value) in map {
            self.write_i32(id.0)?;
            self.write_f64(*value)?;
        }
        Ok(())
    }

    pub fn write_pore_set(&mut self, set: &BTreeSet<PoreId>) -> io::Result<()> {
        self.write_count(set.len())?;
        for id in set {
            self.write_i32(id.0)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct BinaryReader<R: Read> {
    inner: R,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> io::Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads a count field, rejecting negative values.
    pub fn read_count(&mut self, what: &str) -> io::Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| invalid_data(format!("negative {} count {}", what, count)))
    }

    pub fn read_string(&mut self) -> io::Result<String> {
        let len = self.read_u32()?;
        if len > MAX_STRING_LEN {
            return Err(invalid_data(format!("string length {} exceeds limit", len)));
        }
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| invalid_data(e.to_string()))
    }

    /// Reads until `buf` is full or the data ends, returning how many bytes were filled.
    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Checks the stream against `expected`, tolerating one leading ASCII control byte.
    ///
    /// Data shorter than the token is a mismatch unless it could still be the start of the
    /// token, in which case it is reported as truncation.
    pub fn read_magic(&mut self, expected: &[u8; MAGIC_LEN]) -> io::Result<MagicCheck> {
        let mut buf = [0u8; MAGIC_LEN];
        let filled = self.read_up_to(&mut buf)?;
        if filled < MAGIC_LEN {
            let found = &buf[..filled];
            let token_start = expected.starts_with(found)
                || (found[0].is_ascii_control() && expected.starts_with(&found[1..]));
            if token_start {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "data ends inside the magic token",
                ));
            }
            return Ok(MagicCheck::Mismatch(found.to_vec()));
        }
        if &buf == expected {
            return Ok(MagicCheck::Exact);
        }
        if buf[0].is_ascii_control() && buf[1..] == expected[..MAGIC_LEN - 1] {
            let last = self.read_u8()?;
            if last == expected[MAGIC_LEN - 1] {
                return Ok(MagicCheck::ControlPrefixed(buf[0]));
            }
        }
        Ok(MagicCheck::Mismatch(buf.to_vec()))
    }

    fn read_pair(&mut self) -> io::Result<(i32, f64)> {
        let id = self.read_i32()?;
        let value = self.read_f64()?;
        Ok((id, value))
    }

    /// Reads `count` then that many `(id, value)` pairs, keeping what was read if the data
    /// ends early.
    pub fn read_pressure_map(&mut self) -> io::Result<Section<BTreeMap<PoreId, f64>>> {
        self.read_id_value_pairs("pressure", PoreId)
    }

    pub fn read_flow_map(&mut self) -> io::Result<Section<BTreeMap<ThroatId, f64>>> {
        self.read_id_value_pairs("throat flow", ThroatId)
    }

    fn read_id_value_pairs<K: Ord>(
        &mut self,
        what: &str,
        key: impl Fn(i32) -> K,
    ) -> io::Result<Section<BTreeMap<K, f64>>> {
        let mut map = BTreeMap::new();
        let count = match self.read_count(what) {
            Ok(count) => count,
            Err(e) if is_truncation(&e) => {
                return Ok(Section {
                    value: map,
                    complete: false,
                });
            }
            Err(e) => return Err(e),
        };
        for _ in 0..count {
            match self.read_pair() {
                Ok((id, value)) => {
                    map.insert(key(id), value);
                }
                Err(e) if is_truncation(&e) => {
                    return Ok(Section {
                        value: map,
                        complete: false,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Section {
            value: map,
            complete: true,
        })
    }

    pub fn read_pore_set(&mut self) -> io::Result<Section<BTreeSet<PoreId>>> {
        let mut set = BTreeSet::new();
        let count = match self.read_count("pore set") {
            Ok(count) => count,
            Err(e) if is_truncation(&e) => {
                return Ok(Section {
                    value: set,
                    complete: false,
                });
            }
            Err(e) => return Err(e),
        };
        for _ in 0..count {
            match self.read_i32() {
                Ok(id) => {
                    set.insert(PoreId(id));
                }
                Err(e) if is_truncation(&e) => {
                    return Ok(Section {
                        value: set,
                        complete: false,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Section {
            value: set,
            complete: true,
        })
    }
}
