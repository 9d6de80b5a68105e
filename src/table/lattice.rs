//! Ruled ("lattice") table detection: tables are located from the drawn
//! ruling lines of a rendered page, and embedded PDF words are placed into
//! the resulting cell grid.

use std::path::Path;

use anyhow::Result;
use image::GrayImage;

use crate::ocr::renderer::Rasterizer;
use crate::parser::text_extractor::{extract_words, Word};
use crate::table::clean::RawTable;
use crate::table::TableDetector;

const INK_THRESHOLD: u8 = 128;
/// Pixel slack when merging and intersecting ruling lines.
const JOIN_TOLERANCE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ruling {
    /// Row of a horizontal ruling, column of a vertical one.
    pub pos: u32,
    pub start: u32,
    pub end: u32,
}

/// Row and column boundaries of one table, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Grid {
    pub rows: Vec<u32>,
    pub cols: Vec<u32>,
}

impl Grid {
    fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let row = interval(&self.rows, y)?;
        let col = interval(&self.cols, x)?;
        Some((row, col))
    }
}

fn interval(bounds: &[u32], value: f32) -> Option<usize> {
    bounds
        .windows(2)
        .position(|w| value >= w[0] as f32 && value < w[1] as f32)
}

pub struct LatticeTableDetector<R: Rasterizer> {
    renderer: R,
    zoom: f32,
    line_scale: u32,
}

impl<R: Rasterizer> LatticeTableDetector<R> {
    pub fn new(renderer: R, zoom: f32, line_scale: u32) -> Self {
        Self {
            renderer,
            zoom,
            line_scale: line_scale.max(1),
        }
    }
}

impl<R: Rasterizer> TableDetector for LatticeTableDetector<R> {
    fn detect(&self, pdf_path: &Path, page_number: usize) -> Result<Vec<RawTable>> {
        let page_idx = page_number.saturating_sub(1);
        let image = self.renderer.render_page(pdf_path, page_idx, self.zoom)?;
        let gray = image::imageops::grayscale(&image);

        let grids = find_grids(&gray, self.line_scale);
        if grids.is_empty() {
            tracing::debug!(page = page_number, "no ruled tables on page");
            return Ok(Vec::new());
        }

        let words = extract_words(pdf_path, page_idx)?;
        let tables: Vec<RawTable> = grids
            .iter()
            .map(|grid| fill_grid(grid, &words, self.zoom))
            .collect();
        tracing::debug!(page = page_number, tables = tables.len(), "detected ruled tables");
        Ok(tables)
    }
}

/// Table grids on a page, top to bottom.
pub(crate) fn find_grids(gray: &GrayImage, line_scale: u32) -> Vec<Grid> {
    let (width, height) = gray.dimensions();
    let ink = |x: u32, y: u32| gray.get_pixel(x, y)[0] < INK_THRESHOLD;

    let horizontal = merge_segments(scan_runs(height, width, (width / line_scale).max(2), |y, x| {
        ink(x, y)
    }));
    let vertical = merge_segments(scan_runs(width, height, (height / line_scale).max(2), |x, y| {
        ink(x, y)
    }));

    let mut grids = group_grids(&horizontal, &vertical);
    grids.sort_by_key(|grid| grid.rows.first().copied().unwrap_or(0));
    grids
}

/// Ink runs at least `min_len` long along each line of the image.
///
/// `outer` iterates rows (for horizontal runs) or columns (for vertical
/// runs); `is_ink(outer, inner)` reads one pixel.
fn scan_runs(outer: u32, inner: u32, min_len: u32, is_ink: impl Fn(u32, u32) -> bool) -> Vec<Ruling> {
    let mut runs = Vec::new();
    for pos in 0..outer {
        let mut start = None;
        for i in 0..=inner {
            let on = i < inner && is_ink(pos, i);
            match (on, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= min_len {
                        runs.push(Ruling {
                            pos,
                            start: s,
                            end: i - 1,
                        });
                    }
                    start = None;
                }
                _ => {}
            }
        }
    }
    runs
}

/// Merges runs on neighbouring lines (thick rulings) into single rulings.
fn merge_segments(runs: Vec<Ruling>) -> Vec<Ruling> {
    // (first pos, last pos, start, end)
    let mut lines: Vec<(u32, u32, u32, u32)> = Vec::new();
    for run in runs {
        let existing = lines.iter_mut().find(|(_, last, start, end)| {
            run.pos <= *last + 1 && run.start <= *end + JOIN_TOLERANCE && run.end + JOIN_TOLERANCE >= *start
        });
        match existing {
            Some(line) => {
                line.1 = run.pos;
                line.2 = line.2.min(run.start);
                line.3 = line.3.max(run.end);
            }
            None => lines.push((run.pos, run.pos, run.start, run.end)),
        }
    }
    lines
        .into_iter()
        .map(|(first, last, start, end)| Ruling {
            pos: (first + last) / 2,
            start,
            end,
        })
        .collect()
}

fn crosses(h: &Ruling, v: &Ruling) -> bool {
    v.pos + JOIN_TOLERANCE >= h.start
        && v.pos <= h.end + JOIN_TOLERANCE
        && h.pos + JOIN_TOLERANCE >= v.start
        && h.pos <= v.end + JOIN_TOLERANCE
}

/// Groups intersecting rulings into tables; a table needs at least two
/// rulings in each direction.
fn group_grids(horizontal: &[Ruling], vertical: &[Ruling]) -> Vec<Grid> {
    let n = horizontal.len() + vertical.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (hi, h) in horizontal.iter().enumerate() {
        for (vi, v) in vertical.iter().enumerate() {
            if crosses(h, v) {
                let a = root(&mut parent, hi);
                let b = root(&mut parent, horizontal.len() + vi);
                parent[a] = b;
            }
        }
    }

    let mut components: Vec<(usize, Vec<u32>, Vec<u32>)> = Vec::new();
    for i in 0..n {
        let r = root(&mut parent, i);
        let idx = match components.iter().position(|(id, _, _)| *id == r) {
            Some(idx) => idx,
            None => {
                components.push((r, Vec::new(), Vec::new()));
                components.len() - 1
            }
        };
        if i < horizontal.len() {
            components[idx].1.push(horizontal[i].pos);
        } else {
            components[idx].2.push(vertical[i - horizontal.len()].pos);
        }
    }

    components
        .into_iter()
        .map(|(_, rows, cols)| Grid {
            rows: dedup_positions(rows),
            cols: dedup_positions(cols),
        })
        .filter(|grid| grid.rows.len() >= 2 && grid.cols.len() >= 2)
        .collect()
}

fn dedup_positions(mut positions: Vec<u32>) -> Vec<u32> {
    positions.sort_unstable();
    let mut out: Vec<u32> = Vec::with_capacity(positions.len());
    for pos in positions {
        match out.last() {
            Some(last) if pos <= last + JOIN_TOLERANCE => {}
            _ => out.push(pos),
        }
    }
    out
}

/// Places each word into the cell containing its centre. `zoom` converts
/// PDF points to grid pixels.
pub(crate) fn fill_grid(grid: &Grid, words: &[Word], zoom: f32) -> RawTable {
    let mut cells: Vec<Vec<Vec<&str>>> =
        vec![vec![Vec::new(); grid.cols.len() - 1]; grid.rows.len() - 1];

    for word in words {
        let (cx, cy) = word.bbox.scale(zoom).center();
        if let Some((row, col)) = grid.cell_at(cx, cy) {
            cells[row][col].push(word.text.as_str());
        }
    }

    cells
        .into_iter()
        .map(|row| row.into_iter().map(|cell| cell.join(" ")).collect())
        .collect()
}
