use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line.
    Json,
    /// Tab separated, human readable.
    Text,
}

pub fn write_records<T, W>(records: &[T], format: OutputFormat, mut writer: W) -> Result<()>
where
    T: Serialize + Display,
    W: Write,
{
    for record in records {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut writer, record).context("failed to encode record")?;
                writeln!(writer)?;
            }
            OutputFormat::Text => writeln!(writer, "{record}")?,
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_output<T>(records: &[T], format: OutputFormat, output: &str) -> Result<()>
where
    T: Serialize + Display,
{
    // 结果写到 stdout 或文件。
    if output == "-" {
        // 允许无中间文件地管道输出到其他工具。
        let stdout = io::stdout().lock();
        return write_records(records, format, stdout).context("failed to write to stdout");
    }

    // 每次查询创建或截断输出文件。
    let file = File::create(output).with_context(|| format!("failed to create {output}"))?;
    write_records(records, format, BufWriter::new(file))
        .with_context(|| format!("failed to write to {output}"))
}
