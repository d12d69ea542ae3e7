use super::binary::{BinaryReader, BinaryWriter, MAGIC_LEN, MagicCheck, is_truncation};
use super::migration::{
    self, CURRENT_VERSION, FormatRevision, PermeabilityLayout, TortuosityField,
};
use super::traits::RecordFile;
use crate::core::models::axis::FlowAxis;
use crate::core::models::ids::PoreId;
use crate::core::models::method::Method;
use crate::core::models::result::{
    Permeability, PermeabilitySimulationResult, PressureField, ThroatFlowMap,
};
use crate::core::physics::units::darcy_to_millidarcy;
use std::collections::BTreeSet;
use std::io::{self, Read, Write};
use thiserror::Error;
use tracing::{debug, warn};

pub const RESULT_MAGIC: &[u8; MAGIC_LEN] = b"PERMRSLT";

#[derive(Debug, Error)]
pub enum ResultFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a permeability result file (leading bytes {found:?})")]
    Format { found: String },
    #[error(
        "Unsupported result file version {found} (readable versions: {supported})",
        supported = migration::supported_versions_label()
    )]
    Version { found: i32 },
    #[error("Result file ends inside the {0}")]
    Truncated(&'static str),
    #[error("Unknown flow axis code {0}")]
    InvalidAxis(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultReadOptions {
    /// Tortuosity applied when a legacy file stores none (or an invalid one).
    pub fallback_tortuosity: f64,
}

impl Default for ResultReadOptions {
    fn default() -> Self {
        Self {
            fallback_tortuosity: 1.0,
        }
    }
}

/// Diagnostics from loading a result file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultLoadReport {
    /// Format revision found on disk.
    pub version: i32,
    pub control_prefix: Option<u8>,
    /// First section that ended early. Later fields were left at their defaults, except
    /// corrected values, which are derived from whatever raw value was read.
    pub truncated_section: Option<&'static str>,
    /// The stored tortuosity was absent or invalid and the fallback was applied.
    pub tortuosity_fallback: bool,
    /// Legacy slot names that were mapped onto a current method.
    pub migrated_slots: Vec<(&'static str, Method)>,
}

impl ResultLoadReport {
    pub fn is_truncated(&self) -> bool {
        self.truncated_section.is_some()
    }

    pub fn is_legacy(&self) -> bool {
        self.version < CURRENT_VERSION
    }
}

/// The permeability result binary format.
///
/// Reads every revision in [`migration::REVISIONS`]; always writes the current one.
pub struct ResultFile;

impl RecordFile for ResultFile {
    type Record = PermeabilitySimulationResult;
    type ReadOptions = ResultReadOptions;
    type Report = ResultLoadReport;
    type Error = ResultFileError;

    fn read_from(
        reader: &mut impl Read,
        options: &ResultReadOptions,
    ) -> Result<(PermeabilitySimulationResult, ResultLoadReport), ResultFileError> {
        let mut reader = BinaryReader::new(reader);
        let mut report = ResultLoadReport::default();

        match header(reader.read_magic(RESULT_MAGIC))? {
            MagicCheck::Exact => {}
            MagicCheck::ControlPrefixed(byte) => {
                warn!(byte, "Skipping control byte in front of result file magic.");
                report.control_prefix = Some(byte);
            }
            MagicCheck::Mismatch(found) => {
                return Err(ResultFileError::Format {
                    found: String::from_utf8_lossy(&found).into_owned(),
                });
            }
        }

        let version = header(reader.read_i32())?;
        let revision =
            migration::revision(version).ok_or(ResultFileError::Version { found: version })?;
        report.version = version;

        let axis_code = header(reader.read_i32())?;
        let mut result = PermeabilitySimulationResult {
            flow_axis: FlowAxis::from_code(axis_code)
                .ok_or(ResultFileError::InvalidAxis(axis_code))?,
            viscosity: header(reader.read_f64())?,
            input_pressure: header(reader.read_f64())?,
            output_pressure: header(reader.read_f64())?,
            model_length: header(reader.read_f64())?,
            model_area: header(reader.read_f64())?,
            ..Default::default()
        };

        let flags = if revision.method_flags {
            let mut flags = Vec::with_capacity(revision.method_slots.len());
            for _ in revision.method_slots {
                flags.push(header(reader.read_bool())?);
            }
            flags
        } else {
            vec![true; revision.method_slots.len()]
        };
        for (slot, used) in revision.method_slots.iter().zip(&flags) {
            result.set_used(slot.method, *used);
            if slot.is_renamed() {
                debug!(
                    legacy = slot.legacy_name,
                    method = %slot.method,
                    "Mapping legacy result slot."
                );
                report.migrated_slots.push((slot.legacy_name, slot.method));
            }
        }

        let mut sections = Sections::new(reader);
        read_body(&mut sections, revision, &mut result, options, &mut report)?;

        report.truncated_section = sections.truncated_at;
        if let Some(section) = report.truncated_section {
            warn!(
                version,
                section, "Result data ends early; later fields left at defaults."
            );
        }
        Ok((result, report))
    }

    fn write_to(
        result: &PermeabilitySimulationResult,
        writer: &mut impl Write,
    ) -> Result<(), ResultFileError> {
        let revision = migration::current();
        let mut writer = BinaryWriter::new(writer);
        writer.write_bytes(RESULT_MAGIC)?;
        writer.write_i32(revision.version)?;
        writer.write_i32(result.flow_axis.code())?;
        writer.write_f64(result.viscosity)?;
        writer.write_f64(result.input_pressure)?;
        writer.write_f64(result.output_pressure)?;
        writer.write_f64(result.model_length)?;
        writer.write_f64(result.model_area)?;

        for slot in revision.method_slots {
            writer.write_bool(result.is_used(slot.method))?;
        }
        writer.write_f64(result.tortuosity)?;
        let blocks = revision
            .method_slots
            .iter()
            .map(|slot| result.permeability(slot.method))
            .chain(std::iter::once(&result.kozeny_carman));
        for k in blocks {
            writer.write_f64(k.raw_darcy)?;
            writer.write_f64(k.raw_millidarcy)?;
            writer.write_f64(k.corrected_darcy)?;
            writer.write_f64(k.corrected_millidarcy)?;
        }

        writer.write_f64(result.total_flow_rate)?;
        writer.write_pressure_map(&result.pressure_field)?;
        for slot in revision.method_slots {
            writer.write_pressure_map(result.pressures(slot.method))?;
        }
        writer.write_flow_map(&result.throat_flow_rates)?;
        writer.write_pore_set(&result.inlet_pores)?;
        writer.write_pore_set(&result.outlet_pores)?;
        if let Some(timestamp) = &result.timestamp {
            writer.write_string(timestamp)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn header<T>(result: io::Result<T>) -> Result<T, ResultFileError> {
    result.map_err(|e| {
        if is_truncation(&e) {
            ResultFileError::Truncated("header")
        } else {
            ResultFileError::Io(e)
        }
    })
}

/// Reads the repeated part of a result body. After the first short read every further
/// request yields its default without touching the stream.
struct Sections<R: Read> {
    reader: BinaryReader<R>,
    truncated_at: Option<&'static str>,
}

impl<R: Read> Sections<R> {
    fn new(reader: BinaryReader<R>) -> Self {
        Self {
            reader,
            truncated_at: None,
        }
    }

    fn stopped(&self) -> bool {
        self.truncated_at.is_some()
    }

    fn mark(&mut self, section: &'static str) {
        if self.truncated_at.is_none() {
            self.truncated_at = Some(section);
        }
    }

    fn f64(&mut self, section: &'static str) -> io::Result<Option<f64>> {
        if self.stopped() {
            return Ok(None);
        }
        match self.reader.read_f64() {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_truncation(&e) => {
                self.mark(section);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// A trailing field that older writers may omit; its absence is not truncation.
    fn trailing_f64(&mut self) -> io::Result<Option<f64>> {
        if self.stopped() {
            return Ok(None);
        }
        match self.reader.read_f64() {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_truncation(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn trailing_string(&mut self) -> io::Result<Option<String>> {
        if self.stopped() {
            return Ok(None);
        }
        match self.reader.read_string() {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_truncation(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn pressures(&mut self, section: &'static str) -> io::Result<PressureField> {
        if self.stopped() {
            return Ok(PressureField::new());
        }
        let read = self.reader.read_pressure_map()?;
        if !read.complete {
            self.mark(section);
        }
        Ok(read.value)
    }

    fn flows(&mut self) -> io::Result<ThroatFlowMap> {
        if self.stopped() {
            return Ok(ThroatFlowMap::new());
        }
        let read = self.reader.read_flow_map()?;
        if !read.complete {
            self.mark("throat flow map");
        }
        Ok(read.value)
    }

    fn pores(&mut self, section: &'static str) -> io::Result<BTreeSet<PoreId>> {
        if self.stopped() {
            return Ok(BTreeSet::new());
        }
        let read = self.reader.read_pore_set()?;
        if !read.complete {
            self.mark(section);
        }
        Ok(read.value)
    }
}

fn resolve_tortuosity(
    stored: Option<f64>,
    options: &ResultReadOptions,
    report: &mut ResultLoadReport,
) -> f64 {
    match stored {
        Some(t) if t.is_finite() && t >= 1.0 => t,
        _ => {
            debug!(
                stored = ?stored,
                fallback = options.fallback_tortuosity,
                "Stored tortuosity missing or invalid, using fallback."
            );
            report.tortuosity_fallback = true;
            options.fallback_tortuosity
        }
    }
}

/// One permeability block as found on disk, before the tortuosity is known.
#[derive(Debug, Default)]
struct StoredPermeability {
    raw_darcy: Option<f64>,
    raw_millidarcy: Option<f64>,
    corrected_darcy: Option<f64>,
    corrected_millidarcy: Option<f64>,
}

impl StoredPermeability {
    fn read<R: Read>(
        sections: &mut Sections<R>,
        layout: PermeabilityLayout,
        section: &'static str,
    ) -> io::Result<Self> {
        let mut stored = Self {
            raw_darcy: sections.f64(section)?,
            ..Default::default()
        };
        match layout {
            PermeabilityLayout::Raw => {}
            PermeabilityLayout::RawCorrected => {
                stored.corrected_darcy = sections.f64(section)?;
            }
            PermeabilityLayout::Full => {
                stored.raw_millidarcy = sections.f64(section)?;
                stored.corrected_darcy = sections.f64(section)?;
                stored.corrected_millidarcy = sections.f64(section)?;
            }
        }
        Ok(stored)
    }

    /// Fills whatever the layout did not store. When the tortuosity fell back, stored
    /// corrected values are discarded and recomputed from the raw value.
    fn resolve(self, tortuosity: f64, recompute_correction: bool) -> Permeability {
        let raw_darcy = self.raw_darcy.unwrap_or_default();
        let derived = Permeability::from_raw_darcy(raw_darcy, tortuosity);
        let (corrected_darcy, corrected_millidarcy) = match self.corrected_darcy {
            Some(corrected) if !recompute_correction => (
                corrected,
                self.corrected_millidarcy
                    .unwrap_or_else(|| darcy_to_millidarcy(corrected)),
            ),
            _ => (derived.corrected_darcy, derived.corrected_millidarcy),
        };
        Permeability {
            raw_darcy,
            raw_millidarcy: self.raw_millidarcy.unwrap_or(derived.raw_millidarcy),
            corrected_darcy,
            corrected_millidarcy,
        }
    }
}

/// Legacy methods had a single pressure field; used methods inherit it.
fn share_pressure_field(result: &mut PermeabilitySimulationResult) {
    let shared = result.pressure_field.clone();
    for method in Method::ALL {
        if result.is_used(method) {
            *result.pressures_mut(method) = shared.clone();
        }
    }
}

fn read_body<R: Read>(
    sections: &mut Sections<R>,
    revision: &FormatRevision,
    result: &mut PermeabilitySimulationResult,
    options: &ResultReadOptions,
    report: &mut ResultLoadReport,
) -> io::Result<()> {
    let mut stored_tortuosity = match revision.tortuosity {
        TortuosityField::Leading => sections.f64("tortuosity")?,
        TortuosityField::Trailing => None,
    };

    let mut blocks = Vec::with_capacity(revision.method_slots.len());
    for slot in revision.method_slots {
        let block =
            StoredPermeability::read(sections, revision.permeability, "method permeabilities")?;
        blocks.push((slot.method, block));
    }
    let kozeny_carman = if revision.kozeny_carman {
        Some(StoredPermeability::read(
            sections,
            PermeabilityLayout::Full,
            "kozeny-carman permeability",
        )?)
    } else {
        None
    };

    result.total_flow_rate = sections.f64("total flow rate")?.unwrap_or_default();
    result.pressure_field = sections.pressures("pressure field")?;
    if revision.per_method_pressures {
        for slot in revision.method_slots {
            *result.pressures_mut(slot.method) = sections.pressures("method pressure fields")?;
        }
    } else {
        share_pressure_field(result);
    }
    result.throat_flow_rates = sections.flows()?;
    result.inlet_pores = sections.pores("inlet pores")?;
    result.outlet_pores = sections.pores("outlet pores")?;

    if revision.tortuosity == TortuosityField::Trailing {
        stored_tortuosity = sections.trailing_f64()?;
        if let Some((_, darcy)) = blocks.iter_mut().find(|(m, _)| *m == Method::Darcy) {
            darcy.corrected_darcy = sections.trailing_f64()?;
        }
    }
    if revision.timestamp {
        result.timestamp = sections.trailing_string()?;
    }

    result.tortuosity = resolve_tortuosity(stored_tortuosity, options, report);
    let recompute = report.tortuosity_fallback;
    for (method, block) in blocks {
        *result.permeability_mut(method) = block.resolve(result.tortuosity, recompute);
    }
    if let Some(block) = kozeny_carman {
        result.kozeny_carman = block.resolve(result.tortuosity, recompute);
    }
    Ok(())
}
