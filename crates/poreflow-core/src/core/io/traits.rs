use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Defines the interface for reading and writing a persisted binary record.
///
/// Implementors handle one format each (the pore network or the simulation result). Reading
/// returns the record together with a format-specific report describing what was recovered
/// from imperfect input, so callers can decide whether a partial load is acceptable.
pub trait RecordFile {
    /// The in-memory record the format stores.
    type Record;

    /// Options that influence how legacy or incomplete files are interpreted.
    type ReadOptions: Default;

    /// Diagnostics collected while reading.
    type Report;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a record from a byte stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not in this format or is damaged beyond recovery.
    fn read_from(
        reader: &mut impl Read,
        options: &Self::ReadOptions,
    ) -> Result<(Self::Record, Self::Report), Self::Error>;

    /// Writes a record in the current revision of the format.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(record: &Self::Record, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a record from a file path with default options.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Self::Record, Self::Report), Self::Error> {
        Self::read_from_path_with(path, &Self::ReadOptions::default())
    }

    /// Reads a record from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path_with<P: AsRef<Path>>(
        path: P,
        options: &Self::ReadOptions,
    ) -> Result<(Self::Record, Self::Report), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, options)
    }

    /// Writes a record to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(record: &Self::Record, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(record, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
