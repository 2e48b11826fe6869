// Route encoder
// This file writes steps back into the route wire format; used by callers
// assembling routes, the replay tool and tests
//
// Numan Thabit 2025 Nov

use alloy_primitives::Address;

use crate::codec::{put_address, put_u16, put_u256};
use crate::errors::RouteError;
use crate::ledger::Permit;
use crate::router::routes::{Step, VenueCall};

/// Encodes `steps` in order. Fails when a step cannot be represented
/// (more than 255 venues, or a venue payload longer than 65535 bytes).
pub fn encode_route(steps: &[Step]) -> Result<Vec<u8>, RouteError> {
    let mut buf = Vec::new();
    for step in steps {
        buf.push(step.command() as u8);
        match step {
            Step::PullFromCaller { asset, venues } | Step::UseEngineBalance { asset, venues } => {
                put_address(&mut buf, *asset);
                put_venues(&mut buf, venues)?;
            }
            Step::DistributeNative { venues } => put_venues(&mut buf, venues)?,
            Step::UseSingleVenueWithEngineBalance { asset, venue } => {
                put_address(&mut buf, *asset);
                put_payload(&mut buf, venue)?;
            }
            Step::ApplyPermit(permit) => {
                put_u256(&mut buf, permit.value);
                put_u256(&mut buf, permit.deadline);
                buf.push(permit.v);
                buf.extend_from_slice(permit.r.as_slice());
                buf.extend_from_slice(permit.s.as_slice());
            }
        }
    }
    Ok(buf)
}

fn put_venues(buf: &mut Vec<u8>, venues: &[VenueCall]) -> Result<(), RouteError> {
    let count = u8::try_from(venues.len()).map_err(|_| {
        RouteError::InvalidRequest(format!("{} venues exceed the 255 per step", venues.len()))
    })?;
    buf.push(count);
    for venue in venues {
        put_u16(buf, venue.share_weight);
        put_payload(buf, venue)?;
    }
    Ok(())
}

fn put_payload(buf: &mut Vec<u8>, venue: &VenueCall) -> Result<(), RouteError> {
    let len = u16::try_from(venue.params.len() + 4).map_err(|_| {
        RouteError::InvalidRequest(format!(
            "venue payload of {} bytes exceeds 65535",
            venue.params.len() + 4
        ))
    })?;
    put_u16(buf, len);
    buf.extend_from_slice(venue.tag.as_bytes());
    buf.extend_from_slice(&venue.params);
    Ok(())
}

/// Fluent assembly of a route.
#[derive(Debug, Clone, Default)]
pub struct RouteBuilder {
    steps: Vec<Step>,
}

impl RouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pull_from_caller(mut self, asset: Address, venues: Vec<VenueCall>) -> Self {
        self.steps.push(Step::PullFromCaller { asset, venues });
        self
    }

    pub fn use_engine_balance(mut self, asset: Address, venues: Vec<VenueCall>) -> Self {
        self.steps.push(Step::UseEngineBalance { asset, venues });
        self
    }

    pub fn use_single_venue(mut self, asset: Address, venue: VenueCall) -> Self {
        self.steps
            .push(Step::UseSingleVenueWithEngineBalance { asset, venue });
        self
    }

    pub fn distribute_native(mut self, venues: Vec<VenueCall>) -> Self {
        self.steps.push(Step::DistributeNative { venues });
        self
    }

    pub fn apply_permit(mut self, permit: Permit) -> Self {
        self.steps.push(Step::ApplyPermit(permit));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn build(&self) -> Result<Vec<u8>, RouteError> {
        encode_route(&self.steps)
    }
}

impl From<RouteBuilder> for Vec<Step> {
    fn from(builder: RouteBuilder) -> Self {
        builder.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::decoder::decode_route;
    use crate::router::routes::FULL_SHARE;
    use crate::venues::adapter::AdapterTag;
    use alloy_primitives::{B256, U256};

    #[test]
    fn built_route_decodes_to_the_same_steps() {
        let token = Address::repeat_byte(0x01);
        let builder = RouteBuilder::new()
            .apply_permit(Permit {
                value: U256::from(10u64),
                deadline: U256::MAX,
                v: 28,
                r: B256::repeat_byte(0x01),
                s: B256::repeat_byte(0x02),
            })
            .pull_from_caller(
                token,
                vec![
                    VenueCall::new(100, AdapterTag(*b"cpmm"), vec![9; 44]),
                    VenueCall::new(200, AdapterTag(*b"clmm"), vec![8; 41]),
                ],
            )
            .use_single_venue(token, VenueCall::full(AdapterTag(*b"wrap"), vec![1]))
            .distribute_native(vec![VenueCall::full(AdapterTag(*b"wrap"), vec![0])]);

        let bytes = builder.build().unwrap();
        assert_eq!(decode_route(&bytes).unwrap(), builder.steps().to_vec());
    }

    #[test]
    fn too_many_venues_is_rejected() {
        let venues = vec![VenueCall::new(1, AdapterTag(*b"cpmm"), vec![]); 256];
        let err = RouteBuilder::new()
            .pull_from_caller(Address::ZERO, venues)
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidRequest(_)));
    }

    #[test]
    fn single_venue_weight_is_implicit() {
        let bytes = RouteBuilder::new()
            .use_single_venue(
                Address::ZERO,
                VenueCall::new(7, AdapterTag(*b"wrap"), vec![]),
            )
            .build()
            .unwrap();
        // command + asset + len + tag, no weight on the wire
        assert_eq!(bytes.len(), 1 + 20 + 2 + 4);
        match &decode_route(&bytes).unwrap()[0] {
            Step::UseSingleVenueWithEngineBalance { venue, .. } => {
                assert_eq!(venue.share_weight, FULL_SHARE)
            }
            other => panic!("unexpected step {other:?}"),
        }
    }
}
