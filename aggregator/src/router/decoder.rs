// Route decoder
// This file turns a route byte buffer into the ordered sequence of steps,
// checking structure only and leaving venue payloads opaque
//
// Numan Thabit 2025 Nov

use crate::codec::Cursor;
use crate::errors::DecodeError;
use crate::ledger::Permit;
use crate::router::routes::{CommandCode, Step, VenueCall, FULL_SHARE};
use crate::venues::adapter::AdapterTag;

/// Pull decoder over a route buffer. Stateless apart from its cursor, so
/// decoding the same bytes twice yields the same steps.
#[derive(Debug, Clone)]
pub struct RouteDecoder<'a> {
    cursor: Cursor<'a>,
    failed: bool,
}

impl<'a> RouteDecoder<'a> {
    pub fn new(route: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(route),
            failed: false,
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Next step, or `None` once the buffer is exhausted.
    pub fn next_step(&mut self) -> Result<Option<Step>, DecodeError> {
        if self.cursor.is_exhausted() {
            return Ok(None);
        }
        let offset = self.cursor.position();
        let code = self.cursor.read_u8()?;
        let command =
            CommandCode::from_byte(code).ok_or(DecodeError::UnknownCommand { code, offset })?;

        let step = match command {
            CommandCode::PullFromCaller => {
                let asset = self.cursor.read_address()?;
                Step::PullFromCaller {
                    asset,
                    venues: self.read_venues()?,
                }
            }
            CommandCode::UseEngineBalance => {
                let asset = self.cursor.read_address()?;
                Step::UseEngineBalance {
                    asset,
                    venues: self.read_venues()?,
                }
            }
            CommandCode::DistributeNative => Step::DistributeNative {
                venues: self.read_venues()?,
            },
            CommandCode::UseSingleVenueWithEngineBalance => {
                let asset = self.cursor.read_address()?;
                let venue = self.read_venue_payload(FULL_SHARE)?;
                Step::UseSingleVenueWithEngineBalance { asset, venue }
            }
            CommandCode::ApplyPermit => Step::ApplyPermit(Permit {
                value: self.cursor.read_u256()?,
                deadline: self.cursor.read_u256()?,
                v: self.cursor.read_u8()?,
                r: self.cursor.read_b256()?,
                s: self.cursor.read_b256()?,
            }),
        };
        Ok(Some(step))
    }

    fn read_venues(&mut self) -> Result<Vec<VenueCall>, DecodeError> {
        let offset = self.cursor.position();
        let count = self.cursor.read_u8()?;
        if count == 0 {
            return Err(DecodeError::EmptyVenueList { offset });
        }
        (0..count)
            .map(|_| {
                let weight = self.cursor.read_u16()?;
                self.read_venue_payload(weight)
            })
            .collect()
    }

    fn read_venue_payload(&mut self, share_weight: u16) -> Result<VenueCall, DecodeError> {
        // payload starts after its two-byte length
        let offset = self.cursor.position() + 2;
        let payload = self.cursor.read_prefixed()?;
        let tag = AdapterTag::from_slice(payload).ok_or(DecodeError::MissingAdapterTag { offset })?;
        Ok(VenueCall::new(share_weight, tag, payload[4..].to_vec()))
    }
}

impl Iterator for RouteDecoder<'_> {
    type Item = Result<Step, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_step() {
            Ok(step) => step.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Decodes a whole route up front.
pub fn decode_route(route: &[u8]) -> Result<Vec<Step>, DecodeError> {
    RouteDecoder::new(route).collect()
}
