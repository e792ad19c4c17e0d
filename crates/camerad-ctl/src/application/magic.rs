//! Magic-board programming: clocking bitstrings into the board's serial
//! register via repeated parameter-set broadcasts.
//!
//! Each bit costs one full broadcast round trip (`setp BitLevel <bit+1>`).
//! That is intentionally slow and sequential — the register is clocked by
//! the parameter write itself, so batching would corrupt the shift order.

use std::path::Path;

use camerad_core::bitreg;
use camerad_core::ChannelId;
use tracing::debug;

use super::camera::{CameraError, CameraSession};

/// Trailer written after every I/O sequence.  A hard-coded register quirk
/// with no channel mapping; the board expects these four bits verbatim.
pub const TRAILER_BITS: &str = "0100";

/// Basename used for magic-board test exposures.
const MAGIC_BASENAME: &str = "zzmagic";

/// The four I/O channel selections of one board setup, from the board's
/// perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIo {
    pub p_in: ChannelId,
    pub n_in: ChannelId,
    pub p_out: ChannelId,
    pub n_out: ChannelId,
}

/// Writes `bits` to the board's serial register, least-significant
/// (rightmost) bit first.  Emits exactly one `setp BitLevel` broadcast per
/// bit: `1` for a zero bit, `2` for a one bit.
pub async fn write_bits(session: &mut CameraSession, bits: &str) -> Result<(), CameraError> {
    debug!("writing bits: {bits}");
    for bit in bits.chars().rev() {
        let level: u8 = if bit == '1' { 2 } else { 1 };
        session.set_param("BitLevel", level).await?;
    }
    Ok(())
}

/// Encodes and writes one full I/O setup: p_in, n_in, p_out, n_out in that
/// fixed order, followed by [`TRAILER_BITS`].
pub async fn run_sequence(session: &mut CameraSession, io: &BoardIo) -> Result<(), CameraError> {
    write_bits(session, &io.p_in.bitstring()).await?;
    write_bits(session, &io.n_in.bitstring()).await?;
    write_bits(session, &io.p_out.bitstring()).await?;
    write_bits(session, &io.n_out.bitstring()).await?;
    write_bits(session, TRAILER_BITS).await
}

/// Stringly-typed variant of [`run_sequence`] for command-line callers.
///
/// Channel kinds are given by name; an unrecognised name does not abort the
/// sequence — it degrades to a single null bit (logged by
/// [`bitreg::bitstring_for`]).
pub async fn run_sequence_named(
    session: &mut CameraSession,
    channels: &[(String, u32); 4],
) -> Result<(), CameraError> {
    for (kind, channel) in channels {
        write_bits(session, &bitreg::bitstring_for(kind, *channel)).await?;
    }
    write_bits(session, TRAILER_BITS).await
}

/// Full magic-board macro: optionally load an ACF file, set type TEST and
/// basename `zzmagic`, program the board I/O, then run `iterations` test
/// exposures of zero seconds.
pub async fn magic_board(
    session: &mut CameraSession,
    acf: Option<&Path>,
    channels: &[(String, u32); 4],
    iterations: u32,
    read_cds: bool,
) -> Result<(), CameraError> {
    if iterations == 0 {
        return Err(CameraError::InvalidArgument(
            "iterations must be > 0".to_string(),
        ));
    }
    let mode = if read_cds { "DEFAULT" } else { "RAW" };
    if let Some(path) = acf {
        session.load_and_init(path, mode).await?;
    }
    session.set_type("TEST").await?;
    session.set_basename(MAGIC_BASENAME).await?;
    run_sequence_named(session, channels).await?;
    session.expose(0.0, iterations).await
}
