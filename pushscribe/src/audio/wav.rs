//! WAV encoding for captured PCM

use std::io::{Cursor, Seek, Write};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::error::AudioResult;
use crate::audio::format::{AudioFormat, BITS_PER_SAMPLE, BYTES_PER_SAMPLE, CHANNELS};

/// WAV header parameters for `format`
pub fn wav_spec(format: AudioFormat) -> WavSpec {
    WavSpec {
        channels: CHANNELS,
        sample_rate: format.sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Write little-endian i16 PCM bytes as a WAV stream
pub fn write_wav<W: Write + Seek>(writer: W, format: AudioFormat, pcm: &[u8]) -> AudioResult<()> {
    let mut wav = WavWriter::new(writer, wav_spec(format))?;
    for pair in pcm.chunks_exact(BYTES_PER_SAMPLE) {
        wav.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    wav.finalize()?;
    Ok(())
}

/// Encode PCM into an in-memory WAV file
pub fn encode_wav(format: AudioFormat, pcm: &[u8]) -> AudioResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    write_wav(&mut cursor, format, pcm)?;
    Ok(cursor.into_inner())
}
