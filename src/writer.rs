use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
};

use log::error;

use crate::{errors::MonitorError, transport::Frame};

/// Drains recorded session frames into a JSON Lines file. One line per
/// frame, flushed when the sending side closes the channel.
pub fn write_recording(
    file: &PathBuf,
    frame_receiver: Receiver<Frame>,
) -> Result<(), MonitorError> {
    let recording_file =
        File::create(file).map_err(|e| MonitorError::WriterError { source: e })?;
    let mut recording_writer = BufWriter::new(recording_file);
    for frame in &frame_receiver {
        match serde_json::to_string(&frame) {
            Ok(line) => {
                if let Err(e) = writeln!(recording_writer, "{}", line) {
                    error!("error writing session frame to recording: {}", e);
                }
            }
            Err(e) => error!("could not serialize session frame: {}", e),
        }
    }
    recording_writer
        .flush()
        .map_err(|e| MonitorError::WriterError { source: e })?;
    Ok(())
}
