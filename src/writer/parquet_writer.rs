//! Parquet encoding for output tables

use crate::Result;
use arrow_array::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterVersion};

/// Default ZSTD level for data files
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Encodes record batches into self-contained Parquet files
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    props: WriterProperties,
}

impl ParquetWriter {
    /// Create a writer using ZSTD at `compression_level` (1..=22)
    pub fn new(compression_level: i32) -> Result<Self> {
        let props = Self::build_writer_properties(compression_level)?;
        Ok(Self { props })
    }

    fn build_writer_properties(compression_level: i32) -> Result<WriterProperties> {
        Ok(WriterProperties::builder()
            .set_writer_version(WriterVersion::PARQUET_2_0)
            .set_compression(Compression::ZSTD(ZstdLevel::try_new(compression_level)?))
            // Dimension tables repeat names, levels and locations heavily
            .set_dictionary_enabled(true)
            .set_dictionary_page_size_limit(1_000_000)
            .set_max_row_group_size(500_000)
            // Page statistics let readers prune on year/month and ids
            .set_statistics_enabled(EnabledStatistics::Page)
            .set_bloom_filter_enabled(false)
            .set_data_page_size_limit(1024 * 1024)
            .build())
    }

    /// Encode one batch, including zero-row batches, as a Parquet file
    pub fn write_batch(&self, batch: &RecordBatch) -> Result<Bytes> {
        let mut buffer = Vec::new();

        {
            let mut writer =
                ArrowWriter::try_new(&mut buffer, batch.schema(), Some(self.props.clone()))?;

            if batch.num_rows() > 0 {
                writer.write(batch)?;
            }
            writer.close()?;
        }

        Ok(Bytes::from(buffer))
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self {
            props: Self::build_writer_properties(DEFAULT_COMPRESSION_LEVEL)
                .unwrap_or_else(|_| WriterProperties::builder().build()),
        }
    }
}
