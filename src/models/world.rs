use crate::error::{AppResult, DomainError};
use crate::models::types::{Position, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Edge length of one grid cell, in world pixels.
pub const TILE_SIZE: f64 = 32.0;

/// Spawn cell used when the grid has no common-zone cell at all.
pub const FALLBACK_SPAWN: Cell = Cell { row: 2, col: 2 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn center(&self) -> Position {
        Position::new(
            self.col as f64 * TILE_SIZE + TILE_SIZE / 2.0,
            self.row as f64 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }
}

/// World as it travels over the wire: the grid plus per-zone display colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldData {
    pub map: Vec<Vec<ZoneId>>,
    #[serde(default)]
    pub zone_colors: Vec<String>,
}

impl WorldData {
    /// Builds world data from raw zone numbers, without colours.
    pub fn from_rows(rows: &[&[u32]]) -> Self {
        Self {
            map: rows.iter().map(|r| r.iter().map(|z| ZoneId(*z)).collect()).collect(),
            zone_colors: Vec::new(),
        }
    }
}

/// Immutable zone layout of the active session.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    data: WorldData,
    rows: usize,
    cols: usize,
}

impl World {
    pub fn new(data: WorldData) -> AppResult<Self> {
        let rows = data.map.len();
        let cols = data.map.first().map(Vec::len).unwrap_or(0);

        if rows == 0 || cols == 0 {
            return Err(DomainError::InvalidWorld("grid is empty".into()));
        }
        if let Some(row) = data.map.iter().position(|r| r.len() != cols) {
            return Err(DomainError::InvalidWorld(format!(
                "row {row} has {} cells, expected {cols}",
                data.map[row].len()
            )));
        }

        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &WorldData {
        &self.data
    }

    /// Zone of a cell; `None` outside the grid.
    pub fn zone_at(&self, row: i64, col: i64) -> Option<ZoneId> {
        if row < 0 || col < 0 {
            return None;
        }
        self.data.map.get(row as usize)?.get(col as usize).copied()
    }

    /// Zone under a world-space point; `None` outside the grid.
    pub fn lookup_zone(&self, pos: Position) -> Option<ZoneId> {
        if !pos.is_finite() {
            return None;
        }
        let col = (pos.x / TILE_SIZE).floor() as i64;
        let row = (pos.y / TILE_SIZE).floor() as i64;
        self.zone_at(row, col)
    }

    /// First common-zone cell in row-major order.
    pub fn spawn_cell(&self) -> Cell {
        self.data
            .map
            .iter()
            .enumerate()
            .find_map(|(row, cells)| {
                cells
                    .iter()
                    .position(|z| z.is_common())
                    .map(|col| Cell { row, col })
            })
            .unwrap_or(FALLBACK_SPAWN)
    }

    pub fn spawn_point(&self) -> Position {
        self.spawn_cell().center()
    }

    pub fn zone_counts(&self) -> BTreeMap<ZoneId, usize> {
        let mut counts = BTreeMap::new();
        for zone in self.data.map.iter().flatten() {
            *counts.entry(*zone).or_insert(0) += 1;
        }
        counts
    }
}
