use super::binary::{BinaryReader, BinaryWriter, MAGIC_LEN, MagicCheck, is_truncation};
use super::traits::RecordFile;
use crate::core::models::ids::{PoreId, ThroatId};
use crate::core::models::network::{ModelError, PoreNetworkModel, PoreNetworkModelBuilder};
use crate::core::models::pore::{Pore, Throat};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const NETWORK_MAGIC: &[u8; MAGIC_LEN] = b"PORENET1";
pub const NETWORK_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum NetworkFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a pore network file (leading bytes {found:?})")]
    Format { found: String },
    #[error("Unsupported pore network file version {found}")]
    Version { found: i32 },
    #[error("Pore network file ends inside the {0}")]
    Truncated(&'static str),
    #[error("Invalid pore network: {0}")]
    Model(#[from] ModelError),
}

/// Diagnostics from loading a network file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Stray control byte found in front of the magic token.
    pub control_prefix: Option<u8>,
    pub declared_pores: usize,
    pub declared_throats: usize,
    pub pores_read: usize,
    pub throats_read: usize,
    /// Throats discarded because an endpoint pore is not in the file.
    pub dropped_throats: Vec<ThroatId>,
    /// The data ended before every declared record was read.
    pub truncated: bool,
    pub porosity_clamped: bool,
    pub tortuosity_raised: bool,
    pub pixel_size_reset: bool,
}

impl LoadReport {
    /// Whether the file loaded exactly as written.
    pub fn is_clean(&self) -> bool {
        self.control_prefix.is_none()
            && !self.truncated
            && self.dropped_throats.is_empty()
            && !self.porosity_clamped
            && !self.tortuosity_raised
            && !self.pixel_size_reset
    }
}

/// Record counts for a headerless dump of pore and throat records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawNetworkLayout {
    pub pore_count: usize,
    pub throat_count: usize,
    pub pixel_size: f64,
}

/// The pore network binary format.
pub struct NetworkFile;

impl RecordFile for NetworkFile {
    type Record = PoreNetworkModel;
    type ReadOptions = ();
    type Report = LoadReport;
    type Error = NetworkFileError;

    fn read_from(
        reader: &mut impl Read,
        _options: &(),
    ) -> Result<(PoreNetworkModel, LoadReport), NetworkFileError> {
        let mut reader = BinaryReader::new(reader);
        let mut report = LoadReport::default();

        match header(reader.read_magic(NETWORK_MAGIC))? {
            MagicCheck::Exact => {}
            MagicCheck::ControlPrefixed(byte) => {
                warn!(byte, "Skipping control byte in front of network file magic.");
                report.control_prefix = Some(byte);
            }
            MagicCheck::Mismatch(found) => {
                return Err(NetworkFileError::Format {
                    found: String::from_utf8_lossy(&found).into_owned(),
                });
            }
        }

        let version = header(reader.read_i32())?;
        if version != NETWORK_VERSION {
            return Err(NetworkFileError::Version { found: version });
        }

        let pore_count = header(reader.read_count("pore"))?;
        let throat_count = header(reader.read_count("throat"))?;
        let pixel_size = header(reader.read_f64())?;
        let porosity = header(reader.read_f64())?;
        let tortuosity = header(reader.read_f64())?;

        report.declared_pores = pore_count;
        report.declared_throats = throat_count;

        let model = read_records(
            &mut reader,
            pore_count,
            throat_count,
            Scalars {
                pixel_size,
                porosity,
                tortuosity,
            },
            &mut report,
        )?;
        Ok((model, report))
    }

    fn write_to(network: &PoreNetworkModel, writer: &mut impl Write) -> Result<(), NetworkFileError> {
        let mut writer = BinaryWriter::new(writer);
        writer.write_bytes(NETWORK_MAGIC)?;
        writer.write_i32(NETWORK_VERSION)?;
        writer.write_count(network.pores().len())?;
        writer.write_count(network.throats().len())?;
        writer.write_f64(network.pixel_size())?;
        writer.write_f64(network.porosity())?;
        writer.write_f64(network.tortuosity())?;
        for pore in network.pores() {
            writer.write_i32(pore.id.0)?;
            writer.write_f64(pore.center.x)?;
            writer.write_f64(pore.center.y)?;
            writer.write_f64(pore.center.z)?;
            writer.write_f64(pore.radius)?;
            writer.write_f64(pore.volume)?;
            writer.write_f64(pore.area)?;
            writer.write_i32(pore.connection_count())?;
        }
        for throat in network.throats() {
            writer.write_i32(throat.id.0)?;
            writer.write_i32(throat.pore1.0)?;
            writer.write_i32(throat.pore2.0)?;
            writer.write_f64(throat.radius)?;
            writer.write_f64(throat.length)?;
            writer.write_f64(throat.volume)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Parses headerless pore then throat records, as left behind by an interrupted export.
///
/// The recovered model has porosity 0 and tortuosity 1, since those live in the missing
/// header.
pub fn read_raw(
    reader: &mut impl Read,
    layout: RawNetworkLayout,
) -> Result<(PoreNetworkModel, LoadReport), NetworkFileError> {
    let mut reader = BinaryReader::new(reader);
    let mut report = LoadReport {
        declared_pores: layout.pore_count,
        declared_throats: layout.throat_count,
        ..Default::default()
    };
    let model = read_records(
        &mut reader,
        layout.pore_count,
        layout.throat_count,
        Scalars {
            pixel_size: layout.pixel_size,
            porosity: 0.0,
            tortuosity: 1.0,
        },
        &mut report,
    )?;
    info!(
        pores = report.pores_read,
        throats = report.throats_read,
        "Recovered pore network from raw records."
    );
    Ok((model, report))
}

/// Loads a network file, falling back to raw recovery when the file has no valid header.
pub fn read_or_recover_path<P: AsRef<Path>>(
    path: P,
    layout: RawNetworkLayout,
) -> Result<(PoreNetworkModel, LoadReport), NetworkFileError> {
    match NetworkFile::read_from_path(&path) {
        Err(NetworkFileError::Format { found }) => {
            warn!(
                path = %path.as_ref().display(),
                found = %found,
                "No network header found, attempting raw record recovery."
            );
            let mut reader = BufReader::new(File::open(&path)?);
            read_raw(&mut reader, layout)
        }
        other => other,
    }
}

struct Scalars {
    pixel_size: f64,
    porosity: f64,
    tortuosity: f64,
}

fn header<T>(result: io::Result<T>) -> Result<T, NetworkFileError> {
    result.map_err(|e| {
        if is_truncation(&e) {
            NetworkFileError::Truncated("header")
        } else {
            NetworkFileError::Io(e)
        }
    })
}

fn read_pore<R: Read>(reader: &mut BinaryReader<R>) -> io::Result<Pore> {
    let id = PoreId(reader.read_i32()?);
    let center = Point3::new(reader.read_f64()?, reader.read_f64()?, reader.read_f64()?);
    let radius = reader.read_f64()?;
    let volume = reader.read_f64()?;
    let area = reader.read_f64()?;
    // Stored count is advisory; the builder recomputes it from the throat list.
    let _connection_count = reader.read_i32()?;
    Ok(Pore::new(id, center, radius, volume, area))
}

fn read_throat<R: Read>(reader: &mut BinaryReader<R>) -> io::Result<Throat> {
    let id = ThroatId(reader.read_i32()?);
    let pore1 = PoreId(reader.read_i32()?);
    let pore2 = PoreId(reader.read_i32()?);
    let radius = reader.read_f64()?;
    let length = reader.read_f64()?;
    let volume = reader.read_f64()?;
    Ok(Throat::new(id, pore1, pore2, radius, length, volume))
}

fn read_records<R: Read>(
    reader: &mut BinaryReader<R>,
    pore_count: usize,
    throat_count: usize,
    scalars: Scalars,
    report: &mut LoadReport,
) -> Result<PoreNetworkModel, NetworkFileError> {
    let mut builder = PoreNetworkModelBuilder::new();
    builder
        .pixel_size(sanitize_pixel_size(scalars.pixel_size, report))
        .porosity(sanitize_porosity(scalars.porosity, report))
        .tortuosity(sanitize_tortuosity(scalars.tortuosity, report));

    for _ in 0..pore_count {
        match read_pore(reader) {
            Ok(pore) => {
                builder.add_pore(pore)?;
            }
            Err(e) if is_truncation(&e) => {
                report.truncated = true;
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    report.pores_read = builder.pore_count();

    if !report.truncated {
        for _ in 0..throat_count {
            match read_throat(reader) {
                Ok(throat) => {
                    report.throats_read += 1;
                    if builder.has_pore(throat.pore1) && builder.has_pore(throat.pore2) {
                        builder.add_throat(throat)?;
                    } else {
                        report.dropped_throats.push(throat.id);
                    }
                }
                Err(e) if is_truncation(&e) => {
                    report.truncated = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    if report.truncated {
        warn!(
            pores_read = report.pores_read,
            pores_declared = pore_count,
            throats_read = report.throats_read,
            throats_declared = throat_count,
            "Network data ends early; keeping completed records."
        );
    }
    if !report.dropped_throats.is_empty() {
        warn!(
            count = report.dropped_throats.len(),
            "Dropped throats that reference pores missing from the file."
        );
    }

    Ok(builder.build()?)
}

fn sanitize_pixel_size(pixel_size: f64, report: &mut LoadReport) -> f64 {
    if pixel_size.is_finite() && pixel_size > 0.0 {
        return pixel_size;
    }
    warn!(pixel_size, "Invalid pixel size in network file, using 1.0.");
    report.pixel_size_reset = true;
    1.0
}

fn sanitize_porosity(porosity: f64, report: &mut LoadReport) -> f64 {
    let clamped = if porosity.is_nan() {
        0.0
    } else {
        porosity.clamp(0.0, 1.0)
    };
    if clamped != porosity {
        warn!(porosity, clamped, "Porosity out of range, clamping.");
        report.porosity_clamped = true;
    }
    clamped
}

fn sanitize_tortuosity(tortuosity: f64, report: &mut LoadReport) -> f64 {
    if tortuosity.is_finite() && tortuosity >= 1.0 {
        return tortuosity;
    }
    warn!(tortuosity, "Tortuosity below 1, raising to 1.");
    report.tortuosity_raised = true;
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PORE_RECORD_LEN: usize = 4 + 6 * 8 + 4;
    const THROAT_RECORD_LEN: usize = 3 * 4 + 3 * 8;
    const HEADER_LEN: usize = MAGIC_LEN + 3 * 4 + 3 * 8;

    fn sample_network() -> PoreNetworkModel {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.pixel_size(2e-6).porosity(0.25).tortuosity(1.4);
        for i in 0..3 {
            builder
                .add_pore(Pore::new(
                    PoreId(i),
                    Point3::new(i as f64 * 1e-5, 1e-6, 0.0),
                    2e-6,
                    3e-17,
                    5e-11,
                ))
                .unwrap();
        }
        builder
            .add_throat(Throat::new(ThroatId(0), PoreId(0), PoreId(1), 1e-6, 1e-5, 3e-17))
            .unwrap();
        builder
            .add_throat(Throat::new(ThroatId(1), PoreId(1), PoreId(2), 1e-6, 1e-5, 3e-17))
            .unwrap();
        builder.build().unwrap()
    }

    fn encode(network: &PoreNetworkModel) -> Vec<u8> {
        let mut bytes = Vec::new();
        NetworkFile::write_to(network, &mut bytes).unwrap();
        bytes
    }

    fn decode(bytes: Vec<u8>) -> Result<(PoreNetworkModel, LoadReport), NetworkFileError> {
        NetworkFile::read_from(&mut Cursor::new(bytes), &())
    }

    #[test]
    fn written_network_reads_back_identically() {
        let network = sample_network();
        let (loaded, report) = decode(encode(&network)).unwrap();
        assert_eq!(loaded, network);
        assert!(report.is_clean());
    }

    #[test]
    fn encoded_length_matches_record_layout() {
        let bytes = encode(&sample_network());
        assert_eq!(bytes.len(), HEADER_LEN + 3 * PORE_RECORD_LEN + 2 * THROAT_RECORD_LEN);
    }

    #[test]
    fn partial_pore_record_keeps_complete_pores() {
        let mut bytes = encode(&sample_network());
        bytes.truncate(HEADER_LEN + 2 * PORE_RECORD_LEN + 10);
        let (loaded, report) = decode(bytes).unwrap();
        assert_eq!(loaded.pores().len(), 2);
        assert!(loaded.throats().is_empty());
        assert!(report.truncated);
        assert_eq!(report.pores_read, 2);
        assert_eq!(report.declared_pores, 3);
    }

    #[test]
    fn partial_throat_list_keeps_complete_throats() {
        let mut bytes = encode(&sample_network());
        bytes.truncate(HEADER_LEN + 3 * PORE_RECORD_LEN + THROAT_RECORD_LEN + 5);
        let (loaded, report) = decode(bytes).unwrap();
        assert_eq!(loaded.pores().len(), 3);
        assert_eq!(loaded.throats().len(), 1);
        assert_eq!(loaded.pore(PoreId(2)).unwrap().connection_count(), 0);
        assert!(report.truncated);
    }

    #[test]
    fn truncated_header_is_fatal() {
        let mut bytes = encode(&sample_network());
        bytes.truncate(MAGIC_LEN + 6);
        assert!(matches!(
            decode(bytes),
            Err(NetworkFileError::Truncated("header"))
        ));
    }

    #[test]
    fn control_byte_before_magic_is_tolerated() {
        let mut bytes = vec![0x0B];
        bytes.extend(encode(&sample_network()));
        let (loaded, report) = decode(bytes).unwrap();
        assert_eq!(loaded.pores().len(), 3);
        assert_eq!(report.control_prefix, Some(0x0B));
    }

    #[test]
    fn foreign_magic_is_a_format_error() {
        let mut bytes = encode(&sample_network());
        bytes[..MAGIC_LEN].copy_from_slice(b"NOTANET!");
        assert!(matches!(decode(bytes), Err(NetworkFileError::Format { .. })));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = encode(&sample_network());
        bytes[MAGIC_LEN..MAGIC_LEN + 4].copy_from_slice(&2i32.to_le_bytes());
        assert!(matches!(
            decode(bytes),
            Err(NetworkFileError::Version { found: 2 })
        ));
    }

    #[test]
    fn throat_to_missing_pore_is_dropped_and_reported() {
        let mut bytes = encode(&sample_network());
        let pore2_offset = HEADER_LEN + 3 * PORE_RECORD_LEN + THROAT_RECORD_LEN + 8;
        bytes[pore2_offset..pore2_offset + 4].copy_from_slice(&99i32.to_le_bytes());
        let (loaded, report) = decode(bytes).unwrap();
        assert_eq!(loaded.throats().len(), 1);
        assert_eq!(report.dropped_throats, vec![ThroatId(1)]);
    }

    #[test]
    fn duplicate_pore_id_is_fatal() {
        let mut bytes = encode(&sample_network());
        let second_id = HEADER_LEN + PORE_RECORD_LEN;
        bytes[second_id..second_id + 4].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            decode(bytes),
            Err(NetworkFileError::Model(ModelError::DuplicatePore(PoreId(0))))
        ));
    }

    #[test]
    fn out_of_range_scalars_are_repaired() {
        let mut bytes = encode(&sample_network());
        let scalars = MAGIC_LEN + 12;
        bytes[scalars..scalars + 8].copy_from_slice(&(-1.0f64).to_le_bytes());
        bytes[scalars + 8..scalars + 16].copy_from_slice(&1.7f64.to_le_bytes());
        bytes[scalars + 16..scalars + 24].copy_from_slice(&0.5f64.to_le_bytes());
        let (loaded, report) = decode(bytes).unwrap();
        assert_eq!(loaded.pixel_size(), 1.0);
        assert_eq!(loaded.porosity(), 1.0);
        assert_eq!(loaded.tortuosity(), 1.0);
        assert!(report.pixel_size_reset && report.porosity_clamped && report.tortuosity_raised);
    }

    #[test]
    fn raw_records_are_recovered_with_neutral_scalars() {
        let bytes = encode(&sample_network());
        let raw = bytes[HEADER_LEN..].to_vec();
        let layout = RawNetworkLayout {
            pore_count: 3,
            throat_count: 2,
            pixel_size: 2e-6,
        };
        let (loaded, report) = read_raw(&mut Cursor::new(raw), layout).unwrap();
        assert_eq!(loaded.pores().len(), 3);
        assert_eq!(loaded.throats().len(), 2);
        assert_eq!(loaded.porosity(), 0.0);
        assert_eq!(loaded.tortuosity(), 1.0);
        assert!(!report.truncated);
    }

    #[test]
    fn headerless_file_on_disk_falls_back_to_raw_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.bin");
        let bytes = encode(&sample_network());
        std::fs::write(&path, &bytes[HEADER_LEN..]).unwrap();
        let layout = RawNetworkLayout {
            pore_count: 3,
            throat_count: 2,
            pixel_size: 1.0,
        };
        let (loaded, _) = read_or_recover_path(&path, layout).unwrap();
        assert_eq!(loaded.throats().len(), 2);
    }

    #[test]
    fn dump_shorter_than_the_magic_token_still_reaches_raw_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stub.bin");
        std::fs::write(&path, [7u8, 0, 0, 0, 0x10, 0x20]).unwrap();
        let layout = RawNetworkLayout {
            pore_count: 1,
            throat_count: 0,
            pixel_size: 1.0,
        };
        let (loaded, report) = read_or_recover_path(&path, layout).unwrap();
        assert!(loaded.pores().is_empty());
        assert!(report.truncated);
        assert_eq!(report.pores_read, 0);
        assert_eq!(report.declared_pores, 1);
    }

    #[test]
    fn file_cut_inside_the_magic_token_is_truncated() {
        let bytes = encode(&sample_network());
        assert!(matches!(
            decode(bytes[..5].to_vec()),
            Err(NetworkFileError::Truncated("header"))
        ));
    }
}
