// Venturi - a GDL90 traffic and navigation aggregator
// Copyright (C) 2026  Venturi Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! UBX frame validation. No monitor consumes UBX input; frames are
//! checked and described for the debug log only.

use super::ParseError;
use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, u8 as any_u8};
use nom::IResult;

const SYNC: [u8; 2] = [0xB5, 0x62];

/// Header of a validated UBX frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UbxFrame {
    pub class: u8,
    pub id: u8,
    pub payload_len: u16,
}

impl std::fmt::Display for UbxFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "UBX class 0x{:02X} id 0x{:02X} len {}",
            self.class, self.id, self.payload_len
        )
    }
}

fn frame(input: &[u8]) -> IResult<&[u8], (u8, u8, u16, &[u8], &[u8])> {
    let (input, _) = tag(&SYNC[..])(input)?;
    let (input, class) = any_u8(input)?;
    let (input, id) = any_u8(input)?;
    let (input, len) = le_u16(input)?;
    let (input, payload) = take(len)(input)?;
    let (input, checksum) = take(2usize)(input)?;
    Ok((input, (class, id, len, payload, checksum)))
}

/// Validate one UBX frame: sync characters, length and the 8-bit
/// Fletcher checksum over class, id, length and payload.
pub fn parse(input: &[u8]) -> Result<UbxFrame, ParseError> {
    let (_, (class, id, len, _, checksum)) =
        frame(input).map_err(|_| ParseError::Malformed("not a UBX frame".into()))?;

    let (mut ck_a, mut ck_b) = (0u8, 0u8);
    for b in &input[2..6 + len as usize] {
        ck_a = ck_a.wrapping_add(*b);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    if [ck_a, ck_b] != checksum {
        return Err(ParseError::BadChecksum {
            expected: format!("{:02X}{:02X}", ck_a, ck_b),
            actual: format!("{:02X}{:02X}", checksum[0], checksum[1]),
        });
    }

    Ok(UbxFrame {
        class,
        id,
        payload_len: len,
    })
}
