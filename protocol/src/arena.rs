//! The arena text format collaborator (SPEC_FULL §6.3).
//!
//! A convenience, line-oriented map source: each row is a sequence of
//! whitespace-separated cell tokens — `.` empty, `#` wall, `bN` base of
//! seat `N`, `pN` pawn of seat `N`, `f` food. Rows must be rectangular.
//! The core only ever consumes the resulting [`MapConfig`]; pawn/food
//! tokens are accepted syntactically (so hand-authored arenas read
//! naturally) but are not retained, since the world engine places the
//! starting pawn and the initial food roll itself (SPEC_FULL §4.1.1).

use crate::config::MapConfig;
use crate::model::{Dimension, Position};

/// Parses an arena text map into a [`MapConfig`].
///
/// `potential_base_locations` is ordered by seat number `N`, which must
/// be a contiguous `0..seat_count` range (no gaps, no duplicates).
pub fn parse_arena(text: &str) -> Result<MapConfig, ArenaError> {
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().collect())
        .collect();

    if rows.is_empty() {
        return Err(ArenaError::Empty);
    }

    let width = rows[0].len();
    if width == 0 {
        return Err(ArenaError::Empty);
    }
    if rows.iter().any(|row| row.len() != width) {
        return Err(ArenaError::NotRectangular);
    }

    let mut walls = Vec::new();
    let mut bases: Vec<(usize, Position)> = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        for (x, token) in row.iter().enumerate() {
            let position = Position::new(x as i32, y as i32);
            match *token {
                "." | "f" => {}
                "#" => walls.push(position),
                token if token.starts_with('p') && token[1..].parse::<usize>().is_ok() => {}
                token if token.starts_with('b') => {
                    let seat = token[1..]
                        .parse::<usize>()
                        .map_err(|_| ArenaError::BadCell(token.to_string()))?;
                    bases.push((seat, position));
                }
                other => return Err(ArenaError::BadCell(other.to_string())),
            }
        }
    }

    bases.sort_by_key(|(seat, _)| *seat);
    for (index, (seat, _)) in bases.iter().enumerate() {
        if *seat != index {
            return Err(ArenaError::NonContiguousSeats);
        }
    }

    Ok(MapConfig {
        dimension: Dimension {
            width: width as u32,
            height: rows.len() as u32,
        },
        walls,
        potential_base_locations: bases.into_iter().map(|(_, pos)| pos).collect(),
    })
}

/// Why an arena text map failed to parse.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("arena map is empty")]
    Empty,
    #[error("arena rows are not rectangular")]
    NotRectangular,
    #[error("unrecognized arena cell: {0}")]
    BadCell(String),
    #[error("base seat numbers must be a contiguous 0..N range")]
    NonContiguousSeats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_walls_and_bases_in_seat_order() {
        let text = "b1 . #\n.  .  .\n#  . b0";
        let layout = parse_arena(text).unwrap();
        assert_eq!(layout.dimension, Dimension { width: 3, height: 3 });
        assert_eq!(layout.walls, vec![Position::new(2, 0), Position::new(0, 2)]);
        assert_eq!(
            layout.potential_base_locations,
            vec![Position::new(2, 2), Position::new(0, 0)]
        );
    }

    #[test]
    fn rejects_non_rectangular_rows() {
        let text = ". . .\n. .";
        assert!(matches!(parse_arena(text), Err(ArenaError::NotRectangular)));
    }

    #[test]
    fn rejects_unknown_cell() {
        let text = ". x .";
        assert!(matches!(parse_arena(text), Err(ArenaError::BadCell(_))));
    }

    #[test]
    fn rejects_gapped_seat_numbers() {
        let text = "b0 . b2";
        assert!(matches!(
            parse_arena(text),
            Err(ArenaError::NonContiguousSeats)
        ));
    }
}
