//! Message codec - turn payloads to and from bytes
//!
//! ```text
//! payload := move* flag taunt?
//! move    := srcX srcY dstX dstY        (4 signed bytes)
//! flag    := START_GAME | END_GAME | END_TURN | EOF
//! taunt   := UTF-8 bytes to end of payload
//! ```
//!
//! Decoding scans from the front: a flag byte ends the move list, anything else
//! starts a 4-byte move block. The same scan drives stream framing in
//! [`frame_len`], so both transports share one notion of message boundaries.

use crate::error::DecodeError;
use crate::types::{is_valid_coord, ControlFlag, Move, MOVE_LEN};

/// A decoded turn payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub moves: Vec<Move>,
    pub flag: ControlFlag,
    /// `None` when no bytes followed the flag or they were not valid UTF-8.
    pub taunt: Option<String>,
}

impl DecodedMessage {
    /// A control-only message carries no moves.
    pub fn is_control_only(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Encode moves, one flag, and an optional taunt into one payload.
///
/// An empty taunt is omitted, so the receiver sees the taunt as absent.
///
/// # Examples
///
/// ```
/// use checkers_link_core::codec::encode_turn;
/// use checkers_link_core::types::{ControlFlag, Move};
///
/// let mv = Move::new(0, 0, 1, 1).unwrap();
/// let payload = encode_turn(&[mv], ControlFlag::EndTurn, Some("hi"));
/// assert_eq!(payload, vec![0, 0, 1, 1, 0xFE, b'h', b'i']);
/// ```
pub fn encode_turn(moves: &[Move], flag: ControlFlag, taunt: Option<&str>) -> Vec<u8> {
    let taunt = taunt.filter(|t| !t.is_empty());
    let mut out =
        Vec::with_capacity(moves.len() * MOVE_LEN + 1 + taunt.map(str::len).unwrap_or(0));
    for mv in moves {
        out.extend(mv.to_bytes().iter().map(|&b| b as u8));
    }
    out.push(flag.as_byte() as u8);
    if let Some(taunt) = taunt {
        out.extend_from_slice(taunt.as_bytes());
    }
    out
}

/// Encode a control-only payload (no moves).
pub fn encode_control(flag: ControlFlag, taunt: Option<&str>) -> Vec<u8> {
    encode_turn(&[], flag, taunt)
}

/// The taunt, if it fits after `header_len` bytes of moves and flag within a
/// payload limit of `max_len` bytes. A taunt that does not fit is dropped
/// whole; the moves and flag are always sent.
///
/// # Examples
///
/// ```
/// use checkers_link_core::codec::taunt_within;
///
/// assert_eq!(taunt_within(Some("hi"), 5, 8), Some("hi"));
/// assert_eq!(taunt_within(Some("hello"), 5, 8), None);
/// ```
pub fn taunt_within(taunt: Option<&str>, header_len: usize, max_len: usize) -> Option<&str> {
    taunt.filter(|t| header_len.saturating_add(t.len()) <= max_len)
}

/// Decode one complete payload.
pub fn decode(payload: &[u8]) -> Result<DecodedMessage, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let (moves, flag_at) = scan(payload)?.ok_or_else(|| {
        let offset = payload.len() - payload.len() % MOVE_LEN;
        DecodeError::Truncated {
            offset,
            remaining: payload.len() - offset,
        }
    })?;

    let flag = ControlFlag::from_byte(payload[flag_at] as i8)
        .ok_or(DecodeError::Truncated {
            offset: flag_at,
            remaining: payload.len() - flag_at,
        })?;
    let rest = &payload[flag_at + 1..];
    let taunt = if rest.is_empty() {
        None
    } else {
        // Undecodable text is dropped; the moves and flag still count.
        String::from_utf8(rest.to_vec()).ok()
    };

    Ok(DecodedMessage { moves, flag, taunt })
}

/// Length of the first complete unit (moves + flag) in a stream buffer.
///
/// Returns `Ok(None)` when the buffer ends mid-unit and more bytes are needed.
/// Taunt bytes are never part of a stream unit.
pub fn frame_len(buf: &[u8]) -> Result<Option<usize>, DecodeError> {
    Ok(scan(buf)?.map(|(_, flag_at)| flag_at + 1))
}

/// The moves-and-flag prefix of an encoded payload, without the taunt.
///
/// Payloads that do not decode are returned unchanged.
pub fn strip_taunt(payload: &[u8]) -> &[u8] {
    match frame_len(payload) {
        Ok(Some(len)) => &payload[..len],
        _ => payload,
    }
}

/// Collect moves up to the first flag; `None` if the buffer runs out first.
fn scan(buf: &[u8]) -> Result<Option<(Vec<Move>, usize)>, DecodeError> {
    let mut moves = Vec::new();
    let mut index = 0usize;
    while index < buf.len() {
        if ControlFlag::is_reserved(buf[index] as i8) {
            return Ok(Some((moves, index)));
        }
        if buf.len() - index < MOVE_LEN {
            return Ok(None);
        }
        let mut block = [0i8; MOVE_LEN];
        for (i, slot) in block.iter_mut().enumerate() {
            let value = buf[index + i] as i8;
            if !is_valid_coord(value) {
                return Err(DecodeError::InvalidCoordinate {
                    offset: index + i,
                    value,
                });
            }
            *slot = value;
        }
        // Every coordinate was checked above.
        if let Some(mv) = Move::from_bytes(block) {
            moves.push(mv);
        }
        index += MOVE_LEN;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{END_GAME_FLAG, END_TURN_FLAG, START_GAME_FLAG};

    fn mv(a: i8, b: i8, c: i8, d: i8) -> Move {
        Move::new(a, b, c, d).unwrap()
    }

    #[test]
    fn test_two_move_turn_with_taunt_bytes() {
        let payload = encode_turn(
            &[mv(0, 0, 1, 1), mv(1, 1, 2, 2)],
            ControlFlag::EndTurn,
            Some("haha"),
        );
        assert_eq!(
            payload,
            vec![0, 0, 1, 1, 1, 1, 2, 2, END_TURN_FLAG as u8, b'h', b'a', b'h', b'a']
        );

        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded.moves, vec![mv(0, 0, 1, 1), mv(1, 1, 2, 2)]);
        assert_eq!(decoded.flag, ControlFlag::EndTurn);
        assert_eq!(decoded.taunt.as_deref(), Some("haha"));
    }

    #[test]
    fn test_taunt_dropped_when_payload_would_overflow() {
        let header = 2 * MOVE_LEN + 1;
        assert_eq!(taunt_within(Some("gg"), header, header + 2), Some("gg"));
        assert_eq!(taunt_within(Some("ggg"), header, header + 2), None);
        assert_eq!(taunt_within(None, header, 1024), None);

        let long = "x".repeat(1100);
        let taunt = taunt_within(Some(&long), header, 1024);
        let payload = encode_turn(&[mv(0, 0, 1, 1), mv(1, 1, 2, 2)], ControlFlag::EndTurn, taunt);
        assert_eq!(payload.len(), header);
        assert_eq!(decode(&payload).unwrap().moves.len(), 2);
    }

    #[test]
    fn test_end_game_without_trailing_bytes_has_no_taunt() {
        let decoded = decode(&[END_GAME_FLAG as u8]).unwrap();
        assert!(decoded.is_control_only());
        assert_eq!(decoded.flag, ControlFlag::EndGame);
        assert_eq!(decoded.taunt, None);
    }

    #[test]
    fn test_round_trip_samples() {
        let cases: Vec<(Vec<Move>, ControlFlag, Option<&str>)> = vec![
            (vec![], ControlFlag::StartGame, None),
            (vec![], ControlFlag::StartGame, Some("wanna play?")),
            (vec![mv(7, 7, 6, 6)], ControlFlag::EndTurn, None),
            (
                vec![mv(1, 2, 3, 4), mv(3, 4, 5, 6), mv(5, 6, 7, 7)],
                ControlFlag::EndTurn,
                Some("triple jump ✓"),
            ),
            (vec![], ControlFlag::EndGame, Some("You Win!")),
            (vec![], ControlFlag::Eof, None),
        ];
        for (moves, flag, taunt) in cases {
            let decoded = decode(&encode_turn(&moves, flag, taunt)).unwrap();
            assert_eq!(decoded.moves, moves);
            assert_eq!(decoded.flag, flag);
            assert_eq!(decoded.taunt.as_deref(), taunt);
        }
    }

    #[test]
    fn test_empty_taunt_is_omitted() {
        let payload = encode_control(ControlFlag::StartGame, Some(""));
        assert_eq!(payload, vec![START_GAME_FLAG as u8]);
        assert_eq!(decode(&payload).unwrap().taunt, None);
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        assert_eq!(
            decode(&[0, 0, 1, 1, 2, 2]),
            Err(DecodeError::Truncated {
                offset: 4,
                remaining: 2
            })
        );
        assert_eq!(
            decode(&[3]),
            Err(DecodeError::Truncated {
                offset: 0,
                remaining: 1
            })
        );
    }

    #[test]
    fn test_moves_without_flag_are_truncated() {
        assert!(matches!(
            decode(&[0, 0, 1, 1]),
            Err(DecodeError::Truncated { offset: 4, .. })
        ));
    }

    #[test]
    fn test_empty_payload_is_an_error() {
        assert_eq!(decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_negative_coordinate_inside_block_is_rejected() {
        let err = decode(&[0, 0x90, 1, 1, END_TURN_FLAG as u8]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidCoordinate {
                offset: 1,
                value: 0x90u8 as i8
            }
        );
    }

    #[test]
    fn test_invalid_utf8_taunt_is_dropped() {
        let decoded = decode(&[2, 2, 3, 3, END_TURN_FLAG as u8, 0xFF, 0xFE, 0x80]).unwrap();
        assert_eq!(decoded.moves, vec![mv(2, 2, 3, 3)]);
        assert_eq!(decoded.flag, ControlFlag::EndTurn);
        assert_eq!(decoded.taunt, None);
    }

    #[test]
    fn test_frame_len_waits_for_flag() {
        assert_eq!(frame_len(&[]).unwrap(), None);
        assert_eq!(frame_len(&[0, 0, 1]).unwrap(), None);
        assert_eq!(frame_len(&[0, 0, 1, 1]).unwrap(), None);
        assert_eq!(frame_len(&[0, 0, 1, 1, END_TURN_FLAG as u8]).unwrap(), Some(5));
        assert_eq!(
            frame_len(&[END_TURN_FLAG as u8, 4, 4, 5, 5]).unwrap(),
            Some(1)
        );
    }

    #[test]
    fn test_strip_taunt_keeps_moves_and_flag() {
        let payload = encode_turn(&[mv(0, 0, 1, 1)], ControlFlag::EndTurn, Some("bye"));
        assert_eq!(strip_taunt(&payload), &payload[..5]);
        let invitation = encode_control(ControlFlag::StartGame, Some("hello"));
        assert_eq!(strip_taunt(&invitation), &[START_GAME_FLAG as u8]);
    }
}
