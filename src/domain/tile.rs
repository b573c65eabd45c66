/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Floor,            // '.'
    Hole,             // 'X' — no floor, player drops through
    Block,            // 'B' — static block one edge tall
    Treasure,         // 'T' — pickup on a floor tile
    MovingBlock(u8),  // '0'..'9' — initial height code
    Inert(char),      // anything else: no entity, no floor
}

impl Tile {
    pub fn from_char(ch: char) -> Tile {
        match ch {
            '.' => Tile::Floor,
            'X' => Tile::Hole,
            'B' => Tile::Block,
            'T' => Tile::Treasure,
            '0'..='9' => Tile::MovingBlock(ch as u8 - b'0'),
            other => Tile::Inert(other),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Tile::Floor => '.',
            Tile::Hole => 'X',
            Tile::Block => 'B',
            Tile::Treasure => 'T',
            Tile::MovingBlock(d) => (b'0' + d) as char,
            Tile::Inert(ch) => ch,
        }
    }

    /// Does this cell get a ground slab drawn under it?
    pub fn has_floor(self) -> bool {
        matches!(self, Tile::Floor | Tile::Block | Tile::Treasure)
    }
}
