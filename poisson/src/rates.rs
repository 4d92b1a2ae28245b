//! Inbound rate updates.
//!
//! A rate arrives either as a multicast packet (the source id is the packet
//! key under a mask, the payload is the rate) or as a batch:
//!
//! ```txt
//! count: u32 | (id: u32, rate: s16.15)[count]
//! ```

use bytes::{Buf, BufMut};
use neurocore_codec::{Error, FixedSize, RangeCfg, Read, ReadExt, Write};
use neurocore_math::Accum;

/// New rate (in Hz) for one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateUpdate {
    pub id: u32,
    pub rate: Accum,
}

impl RateUpdate {
    /// Interprets a multicast packet as a rate update.
    pub fn from_multicast(key: u32, payload: u32, mask: u32) -> Self {
        Self {
            id: key & mask,
            rate: Accum::from_bits(payload as i32),
        }
    }
}

impl Write for RateUpdate {
    fn write(&self, buf: &mut impl BufMut) {
        self.id.write(buf);
        self.rate.to_bits().write(buf);
    }
}

impl Read for RateUpdate {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        Ok(Self {
            id: u32::read(buf)?,
            rate: Accum::from_bits(i32::read(buf)?),
        })
    }
}

impl FixedSize for RateUpdate {
    const SIZE: usize = u32::SIZE + i32::SIZE;
}

/// Decodes a batch of rate updates.
///
/// Bytes after the last entry are ignored (transports pad payloads).
pub fn decode_batch(mut payload: impl Buf) -> Result<Vec<RateUpdate>, Error> {
    let max = payload.remaining() / RateUpdate::SIZE;
    Vec::<RateUpdate>::read_cfg(&mut payload, &(RangeCfg::from(..=max), ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use neurocore_codec::Encode;

    #[test]
    fn test_multicast() {
        let payload = Accum::from_int(-3).to_bits() as u32;
        let update = RateUpdate::from_multicast(0xABCD_0012, payload, 0xFF);
        assert_eq!(update.id, 0x12);
        assert_eq!(update.rate, Accum::from_int(-3));
    }

    #[test]
    fn test_batch() {
        let updates = vec![
            RateUpdate {
                id: 4,
                rate: Accum::from_int(20),
            },
            RateUpdate {
                id: 9,
                rate: Accum::HALF,
            },
        ];
        let encoded = updates.encode();
        assert_eq!(&encoded[..4], &[2, 0, 0, 0]);
        assert_eq!(&encoded[4..8], &[4, 0, 0, 0]);
        assert_eq!(&encoded[8..12], &(20i32 << 15).to_le_bytes());
        assert_eq!(decode_batch(encoded).unwrap(), updates);
    }

    #[test]
    fn test_batch_padding() {
        let mut encoded = vec![RateUpdate {
            id: 1,
            rate: Accum::ONE,
        }]
        .encode();
        encoded.extend_from_slice(&[0; 3]);
        assert_eq!(decode_batch(encoded).unwrap().len(), 1);
    }

    #[test]
    fn test_batch_malformed() {
        // Count larger than the payload
        let payload = Bytes::from_static(&[3, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0]);
        assert!(matches!(
            decode_batch(payload),
            Err(Error::InvalidLength(3))
        ));

        // Truncated count
        assert_eq!(
            decode_batch(Bytes::from_static(&[1, 0])),
            Err(Error::EndOfBuffer)
        );

        // Empty batch
        assert_eq!(
            decode_batch(Bytes::from_static(&[0, 0, 0, 0])),
            Ok(Vec::new())
        );
    }
}
