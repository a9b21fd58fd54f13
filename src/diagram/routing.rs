use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::RoutingConfig;
use crate::geometry::Coords;

use super::types::{BlockId, CachedGrid, ConnectionId, RouteQuality};
use super::{Diagram, GRID_SPACING};

// ── A* cost scaling ─────────────────────────────────────────────────
/// Integer cost of one grid step so fractional turn penalties stay exact.
const STEP_COST: u32 = 1000;

/// Grid cell `(column, row)`.
pub type Cell = (i32, i32);

/// Pixel offset to grid cell index, truncating toward zero.
pub(crate) fn grid_pt(value: i32) -> i32 {
    value / GRID_SPACING
}

/// Boolean walkability matrix for one block's routing scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkGrid {
    cols: i32,
    rows: i32,
    cells: Vec<bool>,
}

impl WalkGrid {
    /// A grid with every cell walkable.
    pub fn new(cols: i32, rows: i32) -> Self {
        let cols = cols.max(0);
        let rows = rows.max(0);
        Self {
            cols,
            rows,
            cells: vec![true; (cols * rows) as usize],
        }
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.cols && y < self.rows
    }

    /// Cells outside the grid are never walkable.
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.contains(x, y) && self.cells[self.index(x, y)]
    }

    /// Writes outside the grid are ignored.
    pub fn set_walkable(&mut self, x: i32, y: i32, walkable: bool) {
        if self.contains(x, y) {
            let idx = self.index(x, y);
            self.cells[idx] = walkable;
        }
    }

    /// Mark the inclusive rectangle `(x0, y0) ..= (x1, y1)` unwalkable.
    pub fn block_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        for y in y0.max(0)..=y1.min(self.rows - 1) {
            for x in x0.max(0)..=x1.min(self.cols - 1) {
                self.set_walkable(x, y, false);
            }
        }
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.cols + x) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("start cell ({0}, {1}) lies outside the grid")]
    StartOutOfGrid(i32, i32),
    #[error("end cell ({0}, {1}) lies outside the grid")]
    EndOutOfGrid(i32, i32),
    #[error("end cell ({0}, {1}) is not walkable")]
    EndBlocked(i32, i32),
    #[error("no walkable path between the endpoints")]
    Unreachable,
    #[error("search gave up after {0} expansions")]
    StepLimit(usize),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SearchState {
    x: i32,
    y: i32,
    dir: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SearchEntry {
    est: u32,
    cost: u32,
    state: SearchState,
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| self.cost.cmp(&other.cost))
            .then_with(|| other.state.y.cmp(&self.state.y))
            .then_with(|| other.state.x.cmp(&self.state.x))
            .then_with(|| other.state.dir.cmp(&self.state.dir))
    }
}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const DIRS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Shortest 4-connected path from `start` to `end` over walkable cells.
///
/// The start cell itself may be unwalkable (a pin sitting on an obstacle
/// edge); every other visited cell must be walkable. Heading changes cost
/// `turn_penalty` extra steps when staircase avoidance is on. Returns every
/// visited cell, endpoints included.
pub fn find_path(
    grid: &WalkGrid,
    start: Cell,
    end: Cell,
    config: &RoutingConfig,
) -> Result<Vec<Cell>, PathError> {
    if !grid.contains(start.0, start.1) {
        return Err(PathError::StartOutOfGrid(start.0, start.1));
    }
    if !grid.contains(end.0, end.1) {
        return Err(PathError::EndOutOfGrid(end.0, end.1));
    }
    if start == end {
        return Ok(vec![start]);
    }
    if !grid.is_walkable(end.0, end.1) {
        return Err(PathError::EndBlocked(end.0, end.1));
    }

    let turn_cost = if config.avoid_staircase {
        (config.turn_penalty.max(0.0) * STEP_COST as f32).round() as u32
    } else {
        0
    };
    let cols = grid.cols;
    let state_index = |s: &SearchState| ((s.y * cols + s.x) as usize) * 4 + s.dir as usize;
    let states = (grid.cols * grid.rows * 4) as usize;
    let mut best_cost = vec![u32::MAX; states];
    let mut prev: Vec<Option<SearchState>> = vec![None; states];
    let mut heap = BinaryHeap::new();

    let heuristic = |x: i32, y: i32| {
        ((x - end.0).unsigned_abs() + (y - end.1).unsigned_abs()).saturating_mul(STEP_COST)
    };

    for dir in 0..4u8 {
        let state = SearchState {
            x: start.0,
            y: start.1,
            dir,
        };
        best_cost[state_index(&state)] = 0;
        heap.push(SearchEntry {
            est: heuristic(start.0, start.1),
            cost: 0,
            state,
        });
    }

    let mut steps = 0usize;
    let mut end_state = None;
    while let Some(SearchEntry { cost, state, .. }) = heap.pop() {
        steps += 1;
        if steps > config.max_steps {
            return Err(PathError::StepLimit(config.max_steps));
        }
        if cost != best_cost[state_index(&state)] {
            continue;
        }
        if (state.x, state.y) == end {
            end_state = Some(state);
            break;
        }
        for (dir_idx, (dx, dy)) in DIRS.iter().enumerate() {
            let nx = state.x + dx;
            let ny = state.y + dy;
            if !grid.is_walkable(nx, ny) {
                continue;
            }
            let mut next_cost = cost.saturating_add(STEP_COST);
            // The opening move from the start cell picks a heading for free.
            if cost > 0 && state.dir != dir_idx as u8 {
                next_cost = next_cost.saturating_add(turn_cost);
            }
            let next = SearchState {
                x: nx,
                y: ny,
                dir: dir_idx as u8,
            };
            let next_idx = state_index(&next);
            if next_cost >= best_cost[next_idx] {
                continue;
            }
            best_cost[next_idx] = next_cost;
            prev[next_idx] = Some(state);
            heap.push(SearchEntry {
                est: next_cost.saturating_add(heuristic(nx, ny)),
                cost: next_cost,
                state: next,
            });
        }
    }

    let Some(mut cur) = end_state else {
        return Err(PathError::Unreachable);
    };
    let mut cells = vec![(cur.x, cur.y)];
    while let Some(before) = prev[state_index(&cur)] {
        cells.push((before.x, before.y));
        cur = before;
    }
    cells.reverse();
    Ok(cells)
}

/// Drop every cell that continues a straight run, keeping the endpoints.
pub fn compress_path(cells: &[Cell]) -> Vec<Cell> {
    if cells.len() < 3 {
        return cells.to_vec();
    }
    let heading = |a: Cell, b: Cell| ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    let mut out = vec![cells[0]];
    let mut dir = heading(cells[0], cells[1]);
    for pair in cells.windows(2).skip(1) {
        let next = heading(pair[0], pair[1]);
        if next != dir {
            out.push(pair[0]);
            dir = next;
        }
    }
    out.push(cells[cells.len() - 1]);
    out
}

/// Reserve the interior vertices of a compressed path in `grid`.
fn reserve_interior(grid: &mut WalkGrid, path: &[Cell]) {
    if path.len() > 2 {
        for &(x, y) in &path[1..path.len() - 1] {
            grid.set_walkable(x, y, false);
        }
    }
}

/// Route one net: safe grid first, then the base grid.
///
/// A success on the safe grid reserves the path's interior vertices there so
/// later nets in the same pass steer clear of them.
pub fn route_connection(
    base: &WalkGrid,
    safe: &mut WalkGrid,
    start: Cell,
    end: Cell,
    config: &RoutingConfig,
) -> (Vec<Cell>, RouteQuality) {
    match find_path(safe, start, end, config) {
        Ok(cells) => {
            let path = compress_path(&cells);
            reserve_interior(safe, &path);
            (path, RouteQuality::Separated)
        }
        Err(err) => {
            tracing::debug!(%err, ?start, ?end, "safe routing failed, retrying on the base grid");
            match find_path(base, start, end, config) {
                Ok(cells) => (compress_path(&cells), RouteQuality::Shared),
                Err(err) => {
                    tracing::debug!(%err, ?start, ?end, "net left unrouted");
                    (Vec::new(), RouteQuality::Unroutable)
                }
            }
        }
    }
}

struct RouteJob {
    connection: ConnectionId,
    start: Cell,
    end: Cell,
}

impl Diagram {
    /// Build the base walkability grid for a laid-out block.
    ///
    /// The one-cell perimeter and every visible subblock footprint are
    /// blocked; pins of those subblocks and of the block itself are the only
    /// openings.
    pub(crate) fn build_walk_grid(&self, id: BlockId) -> WalkGrid {
        let block = &self.blocks[id.0];
        let cols = grid_pt(block.bounds.width) + 1;
        let rows = grid_pt(block.bounds.height) + 1;
        let mut grid = WalkGrid::new(cols, rows);

        for x in 0..cols {
            grid.set_walkable(x, 0, false);
            grid.set_walkable(x, rows - 1, false);
        }
        for y in 0..rows {
            grid.set_walkable(0, y, false);
            grid.set_walkable(cols - 1, y, false);
        }

        for &child_id in &block.subblocks {
            let child = &self.blocks[child_id.0];
            if !child.display {
                continue;
            }
            let b = child.bounds;
            let start_x = grid_pt(b.x);
            let start_y = grid_pt(b.y);
            grid.block_rect(
                start_x,
                start_y,
                start_x + grid_pt(b.width),
                start_y + grid_pt(b.height),
            );
            for port_id in child.all_ports() {
                let p = self.ports[port_id.0].bounds;
                grid.set_walkable(grid_pt(b.x + p.x), grid_pt(b.y + p.y), true);
            }
        }

        for port_id in block.all_ports() {
            let p = self.ports[port_id.0].bounds;
            grid.set_walkable(grid_pt(p.x), grid_pt(p.y), true);
        }

        grid
    }

    /// Post-order route pass for `id` and its visible subtree.
    pub(crate) fn route_block(&mut self, id: BlockId, config: &RoutingConfig) {
        if !self.blocks[id.0].display {
            return;
        }
        for child in self.blocks[id.0].subblocks.clone() {
            self.route_block(child, config);
        }

        let mut jobs = Vec::new();
        let mut reserved: Vec<Vec<Cell>> = Vec::new();
        for &conn_id in &self.blocks[id.0].connections {
            let conn = &self.connections[conn_id.0];
            if !conn.visible {
                continue;
            }
            if conn.is_routed() {
                reserved.push(
                    conn.path
                        .iter()
                        .map(|pt| (grid_pt(pt.x), grid_pt(pt.y)))
                        .collect(),
                );
                continue;
            }
            let start_port = &self.ports[conn.start.0];
            let end_port = &self.ports[conn.end.0];
            if !self.is_shown_within(start_port.block, id) || !self.is_shown_within(end_port.block, id)
            {
                continue;
            }
            let (Some(start), Some(end)) = (
                self.port_position_in(conn.start, id),
                self.port_position_in(conn.end, id),
            ) else {
                continue;
            };
            jobs.push(RouteJob {
                connection: conn_id,
                start: (grid_pt(start.x), grid_pt(start.y)),
                end: (grid_pt(end.x), grid_pt(end.y)),
            });
        }

        let revision = self.revision;
        let stale = self.blocks[id.0]
            .grid
            .as_ref()
            .is_none_or(|cached| cached.revision != revision);
        if stale {
            let grid = self.build_walk_grid(id);
            self.blocks[id.0].grid = Some(CachedGrid { revision, grid });
        }
        let Some(cached) = self.blocks[id.0].grid.as_ref() else {
            return;
        };
        let base = &cached.grid;
        let mut safe = base.clone();
        for path in &reserved {
            reserve_interior(&mut safe, path);
        }

        let mut routed = 0usize;
        for job in jobs {
            let (cells, quality) = route_connection(base, &mut safe, job.start, job.end, config);
            if quality != RouteQuality::Unroutable {
                routed += 1;
            }
            let conn = &mut self.connections[job.connection.0];
            conn.path = cells
                .into_iter()
                .map(|(x, y)| Coords::new(x * GRID_SPACING, y * GRID_SPACING))
                .collect();
            conn.quality = Some(quality);
        }
        if routed > 0 {
            tracing::debug!(block = %self.blocks[id.0].id, routed, "routed nets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoutingConfig {
        RoutingConfig::default()
    }

    fn open_grid(cols: i32, rows: i32) -> WalkGrid {
        WalkGrid::new(cols, rows)
    }

    fn assert_orthogonal_and_connected(cells: &[Cell]) {
        for pair in cells.windows(2) {
            let dx = (pair[1].0 - pair[0].0).abs();
            let dy = (pair[1].1 - pair[0].1).abs();
            assert_eq!(dx + dy, 1, "non-adjacent step {:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn straight_run_compresses_to_two_points() {
        let grid = open_grid(20, 10);
        let cells = find_path(&grid, (2, 5), (15, 5), &config()).unwrap();
        assert_eq!(cells.len(), 14);
        assert_eq!(compress_path(&cells), vec![(2, 5), (15, 5)]);
    }

    #[test]
    fn path_detours_around_a_wall() {
        let mut grid = open_grid(20, 20);
        grid.block_rect(10, 0, 10, 15);
        let cells = find_path(&grid, (2, 2), (18, 2), &config()).unwrap();
        assert_orthogonal_and_connected(&cells);
        assert!(cells.iter().all(|&(x, y)| grid.is_walkable(x, y)));
        assert_eq!(cells.first(), Some(&(2, 2)));
        assert_eq!(cells.last(), Some(&(18, 2)));
        assert!(cells.iter().any(|&(_, y)| y > 15));
    }

    #[test]
    fn turn_penalty_prefers_a_single_bend() {
        let grid = open_grid(30, 30);
        let cells = find_path(&grid, (1, 1), (20, 20), &config()).unwrap();
        let compressed = compress_path(&cells);
        assert_eq!(compressed.len(), 3, "expected one corner, got {compressed:?}");
    }

    #[test]
    fn start_may_sit_on_a_blocked_cell() {
        let mut grid = open_grid(10, 10);
        grid.set_walkable(0, 5, false);
        let cells = find_path(&grid, (0, 5), (8, 5), &config()).unwrap();
        assert_eq!(compress_path(&cells), vec![(0, 5), (8, 5)]);
    }

    #[test]
    fn failures_are_typed() {
        let mut grid = open_grid(10, 10);
        assert_eq!(
            find_path(&grid, (-1, 0), (2, 2), &config()),
            Err(PathError::StartOutOfGrid(-1, 0))
        );
        assert_eq!(
            find_path(&grid, (1, 1), (10, 2), &config()),
            Err(PathError::EndOutOfGrid(10, 2))
        );
        grid.set_walkable(5, 5, false);
        assert_eq!(
            find_path(&grid, (1, 1), (5, 5), &config()),
            Err(PathError::EndBlocked(5, 5))
        );
        grid.block_rect(4, 0, 4, 9);
        assert_eq!(
            find_path(&grid, (1, 1), (8, 8), &config()),
            Err(PathError::Unreachable)
        );
    }

    #[test]
    fn step_limit_is_reported() {
        let grid = open_grid(50, 50);
        let tight = RoutingConfig {
            max_steps: 3,
            ..RoutingConfig::default()
        };
        assert_eq!(
            find_path(&grid, (1, 1), (45, 45), &tight),
            Err(PathError::StepLimit(3))
        );
    }

    #[test]
    fn same_cell_is_a_single_point() {
        let grid = open_grid(5, 5);
        assert_eq!(find_path(&grid, (2, 2), (2, 2), &config()), Ok(vec![(2, 2)]));
    }

    #[test]
    fn compress_keeps_corners_only() {
        let cells = [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (3, 2)];
        assert_eq!(compress_path(&cells), vec![(0, 0), (2, 0), (2, 2), (3, 2)]);
        assert_eq!(compress_path(&[(0, 0), (1, 0)]), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn safe_routes_keep_interior_vertices_disjoint() {
        let base = open_grid(30, 30);
        let mut safe = base.clone();
        let (first, q1) = route_connection(&base, &mut safe, (1, 1), (20, 20), &config());
        let (second, q2) = route_connection(&base, &mut safe, (1, 2), (21, 20), &config());
        assert_eq!(q1, RouteQuality::Separated);
        assert_eq!(q2, RouteQuality::Separated);
        let inner = |p: &[Cell]| p[1..p.len() - 1].to_vec();
        for v in inner(&second[..]) {
            assert!(!inner(&first[..]).contains(&v), "shared interior vertex {v:?}");
        }
    }

    #[test]
    fn congested_safe_grid_falls_back_to_base() {
        let base = open_grid(20, 20);
        let mut safe = base.clone();
        safe.block_rect(10, 0, 10, 19);
        let (path, quality) = route_connection(&base, &mut safe, (2, 4), (17, 9), &config());
        assert_eq!(quality, RouteQuality::Shared);
        assert!(path.len() >= 2);
        assert_eq!(path.first(), Some(&(2, 4)));
        assert_eq!(path.last(), Some(&(17, 9)));
    }

    #[test]
    fn unroutable_when_both_grids_fail() {
        let mut base = open_grid(20, 20);
        base.block_rect(10, 0, 10, 19);
        let mut safe = base.clone();
        let (path, quality) = route_connection(&base, &mut safe, (2, 4), (17, 9), &config());
        assert!(path.is_empty());
        assert_eq!(quality, RouteQuality::Unroutable);
    }

    #[test]
    fn search_is_deterministic() {
        let mut grid = open_grid(40, 40);
        grid.block_rect(12, 5, 18, 30);
        let a = find_path(&grid, (2, 20), (35, 21), &config()).unwrap();
        let b = find_path(&grid, (2, 20), (35, 21), &config()).unwrap();
        assert_eq!(a, b);
    }

    /// `top` with ports `a`/`y` holding one child `u0` with ports `b`/`q`.
    fn nested() -> (Diagram, BlockId, BlockId) {
        use crate::diagram::Direction;

        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        d.add_port(top, "a", "a", Direction::Input);
        d.add_port(top, "y", "y", Direction::Output);
        let u0 = d.add_subblock(top, "u0", "u0", true);
        d.add_port(u0, "b", "b", Direction::Input);
        d.add_port(u0, "q", "q", Direction::Output);
        d.route(&config());
        (d, top, u0)
    }

    fn port_cells(d: &Diagram, id: BlockId, offset: Coords) -> Vec<Cell> {
        d.block(id)
            .all_ports()
            .into_iter()
            .map(|p| {
                let b = d.port(p).bounds;
                (grid_pt(offset.x + b.x), grid_pt(offset.y + b.y))
            })
            .collect()
    }

    #[test]
    fn grid_perimeter_is_closed_except_own_ports() {
        let (d, top, _) = nested();
        let grid = d.walk_grid(top).unwrap();
        let bounds = d.block(top).bounds;
        assert_eq!(grid.cols(), grid_pt(bounds.width) + 1);
        assert_eq!(grid.rows(), grid_pt(bounds.height) + 1);

        let own = port_cells(&d, top, Coords::default());
        for &(x, y) in &own {
            assert!(grid.is_walkable(x, y), "own port cell ({x}, {y}) closed");
        }
        let mut edge = Vec::new();
        for x in 0..grid.cols() {
            edge.push((x, 0));
            edge.push((x, grid.rows() - 1));
        }
        for y in 0..grid.rows() {
            edge.push((0, y));
            edge.push((grid.cols() - 1, y));
        }
        for (x, y) in edge {
            if !own.contains(&(x, y)) {
                assert!(!grid.is_walkable(x, y), "perimeter cell ({x}, {y}) open");
            }
        }
    }

    #[test]
    fn child_footprint_is_closed_except_its_pins() {
        let (d, top, u0) = nested();
        let grid = d.walk_grid(top).unwrap();
        let b = d.block(u0).bounds;
        let pins = port_cells(&d, u0, b.origin());
        assert_eq!(pins.len(), 2);

        let (x0, y0) = (grid_pt(b.x), grid_pt(b.y));
        for y in y0..=y0 + grid_pt(b.height) {
            for x in x0..=x0 + grid_pt(b.width) {
                assert_eq!(
                    grid.is_walkable(x, y),
                    pins.contains(&(x, y)),
                    "footprint cell ({x}, {y})"
                );
            }
        }
        // the cell just outside the footprint stays open
        assert!(grid.is_walkable(x0 - 1, y0));
    }

    #[test]
    fn hidden_child_leaves_the_grid() {
        let (mut d, top, u0) = nested();
        d.set_display(u0, false);
        assert!(d.walk_grid(top).is_none());
        d.layout();
        d.route(&config());

        let grid = d.walk_grid(top).unwrap();
        let interior = ((grid.cols() - 2) * (grid.rows() - 2)) as usize;
        assert_eq!(grid.walkable_count(), interior + 2);
    }
}
