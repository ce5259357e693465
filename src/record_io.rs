//! Thin adapter over the external record-stream collaborator.
//!
//! Per spec.md §1/§6 the alignment-record container, its on-disk codec,
//! and the header-structure parser are out of scope: the core only needs
//! the operations named here. This module is the single place that
//! touches `noodles`'s concrete SAM/BAM types; [`crate::driver`] and
//! [`crate::header`] only ever see [`AlignedRecord`] and [`HeaderGroups`].

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::record::data::field::{Tag, Value};
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::header::record::value::{
    map::{Program, ReadGroup},
    Map,
};

use crate::error::{DecodeError, Result};

/// What the index-decoding core needs to read from and write to a record,
/// independent of its wire encoding.
pub trait AlignedRecord {
    fn read_name(&self) -> Option<String>;
    fn set_read_name(&mut self, name: String);
    fn is_qc_fail(&self) -> bool;
    fn get_string_tag(&self, tag: [u8; 2]) -> Option<String>;
    fn set_string_tag(&mut self, tag: [u8; 2], value: &str);
}

impl AlignedRecord for RecordBuf {
    fn read_name(&self) -> Option<String> {
        sam::alignment::Record::name(self).map(|n| n.to_string())
    }

    fn set_read_name(&mut self, name: String) {
        *self.name_mut() = Some(name.into());
    }

    fn is_qc_fail(&self) -> bool {
        sam::alignment::Record::flags(self)
            .map(|f| f.is_qc_fail())
            .unwrap_or(false)
    }

    fn get_string_tag(&self, tag: [u8; 2]) -> Option<String> {
        let tag = Tag::new(tag[0], tag[1]);
        match self.data().get(&tag) {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        }
    }

    fn set_string_tag(&mut self, tag: [u8; 2], value: &str) {
        let tag = Tag::new(tag[0], tag[1]);
        self.data_mut()
            .insert(tag, Value::String(value.into()));
    }
}

/// What the header rewriter (C6) needs from the header collaborator: the
/// ability to read existing read-group entries and to add/remove/update
/// them, plus append a program-invocation record. Everything else about
/// header structure (the parser itself) is out of scope.
pub trait HeaderGroups {
    /// Existing read-group ids, in header order.
    fn read_group_ids(&self) -> Vec<String>;
    /// All sub-tags of a read group except its id, as `(code, value)`.
    fn read_group_tags(&self, id: &str) -> Vec<(String, String)>;
    fn remove_read_group(&mut self, id: &str);
    fn insert_read_group(&mut self, id: String, tags: Vec<(String, String)>);
    fn add_program(&mut self, id: &str, name: &str, version: &str, command_line: &str);
}

impl HeaderGroups for sam::Header {
    fn read_group_ids(&self) -> Vec<String> {
        self.read_groups().keys().map(|k| k.to_string()).collect()
    }

    fn read_group_tags(&self, id: &str) -> Vec<(String, String)> {
        let Some(rg) = self.read_groups().get(id.as_bytes()) else {
            return Vec::new();
        };
        let mut tags = Vec::new();
        if let Some(v) = rg.barcode() {
            tags.push(("BC".to_string(), v.to_string()));
        }
        if let Some(v) = rg.sequencing_center() {
            tags.push(("CN".to_string(), v.to_string()));
        }
        if let Some(v) = rg.description() {
            tags.push(("DS".to_string(), v.to_string()));
        }
        if let Some(v) = rg.library() {
            tags.push(("LB".to_string(), v.to_string()));
        }
        if let Some(v) = rg.program() {
            tags.push(("PG".to_string(), v.to_string()));
        }
        if let Some(v) = rg.platform_unit() {
            tags.push(("PU".to_string(), v.to_string()));
        }
        if let Some(v) = rg.sample_name() {
            tags.push(("SM".to_string(), v.to_string()));
        }
        for (tag, value) in rg.other_fields() {
            tags.push((tag.to_string(), value.to_string()));
        }
        tags
    }

    fn remove_read_group(&mut self, id: &str) {
        self.read_groups_mut().shift_remove(id.as_bytes());
    }

    fn insert_read_group(&mut self, id: String, tags: Vec<(String, String)>) {
        let mut builder = Map::<ReadGroup>::builder();
        for (tag, value) in tags {
            builder = match tag.as_str() {
                "BC" => builder.set_barcode(value),
                "CN" => builder.set_sequencing_center(value),
                "DS" => builder.set_description(value),
                "LB" => builder.set_library(value),
                "PG" => builder.set_program(value),
                "PU" => builder.set_platform_unit(value),
                "SM" => builder.set_sample_name(value),
                other => builder.insert(other.as_bytes().into(), value),
            };
        }
        if let Ok(map) = builder.build() {
            self.read_groups_mut().insert(id.into(), map);
        }
    }

    fn add_program(&mut self, id: &str, name: &str, version: &str, command_line: &str) {
        let map = Map::<Program>::builder()
            .set_name(name)
            .set_version(version)
            .set_command_line(command_line)
            .build();
        if let Ok(map) = map {
            self.programs_mut().as_mut().insert(id.into(), map);
        }
    }
}

/// Opens a BAM reader, returning the parsed header alongside it.
pub fn open_input(path: &Path) -> Result<(bam::io::Reader<Box<dyn io::BufRead>>, sam::Header)> {
    let mut reader = bam::io::reader::Builder::default()
        .build_from_path(path)
        .map_err(DecodeError::StreamIoError)?;
    let header = reader.read_header().map_err(DecodeError::StreamIoError)?;
    Ok((reader, header))
}

/// Opens a BAM writer at `path` (or stdout when `None`), at the given
/// compression level.
pub fn open_output(
    path: Option<&Path>,
    compression_level: Option<u8>,
) -> Result<bam::io::Writer<Box<dyn io::Write>>> {
    let inner: Box<dyn io::Write> = match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).map_err(DecodeError::StreamIoError)?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let mut builder = bam::io::writer::Builder::default();
    if let Some(level) = compression_level {
        builder = builder.set_compression_level(bam::io::writer::CompressionLevel::try_from(level)
            .map_err(|e| DecodeError::StreamIoError(io::Error::new(io::ErrorKind::InvalidInput, e)))?);
    }
    Ok(builder.build_from_writer(inner))
}

/// Writes the (already-rewritten) header once, before any records.
pub fn write_header(writer: &mut bam::io::Writer<Box<dyn io::Write>>, header: &sam::Header) -> Result<()> {
    writer.write_header(header).map_err(DecodeError::StreamIoError)
}

/// Reads the next record off `reader`, or `None` at end of stream.
pub fn read_record(
    reader: &mut bam::io::Reader<Box<dyn io::BufRead>>,
    header: &sam::Header,
) -> Result<Option<RecordBuf>> {
    let mut record = RecordBuf::default();
    let n = reader
        .read_record_buf(header, &mut record)
        .map_err(DecodeError::StreamIoError)?;
    if n == 0 {
        Ok(None)
    } else {
        Ok(Some(record))
    }
}

pub fn write_record(
    writer: &mut bam::io::Writer<Box<dyn io::Write>>,
    header: &sam::Header,
    record: &RecordBuf,
) -> Result<()> {
    writer
        .write_alignment_record(header, record)
        .map_err(DecodeError::StreamIoError)
}
