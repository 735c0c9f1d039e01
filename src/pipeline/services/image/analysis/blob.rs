/// 4-connected region growing over a boolean mask
use super::core::ImageRegion;

/// A connected region of pixels satisfying a threshold predicate.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Row-major pixel indices belonging to the blob.
    pub indices: Vec<usize>,
    pub bounds: ImageRegion,
    pub centroid: (f64, f64),
}

impl Blob {
    pub fn pixel_count(&self) -> usize {
        self.indices.len()
    }

    /// Radius of the disc with the same area.
    pub fn equivalent_radius(&self) -> f64 {
        (self.indices.len() as f64 / std::f64::consts::PI).sqrt()
    }
}

/// Find every 4-connected region of `true` pixels in a row-major mask.
///
/// Uses an explicit stack so large regions cannot overflow the call stack.
pub fn find_blobs(mask: &[bool], width: u32, height: u32) -> Vec<Blob> {
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(mask.len(), w * h);

    let mut visited = vec![false; mask.len()];
    let mut blobs = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..mask.len() {
        if !mask[seed] || visited[seed] {
            continue;
        }

        visited[seed] = true;
        stack.push(seed);

        let mut indices = Vec::new();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);
        let (mut sum_x, mut sum_y) = (0.0, 0.0);

        while let Some(index) = stack.pop() {
            let x = index % w;
            let y = index / w;
            indices.push(index);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            sum_x += x as f64;
            sum_y += y as f64;

            let mut visit = |neighbor: usize| {
                if mask[neighbor] && !visited[neighbor] {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            };
            if x > 0 {
                visit(index - 1);
            }
            if x + 1 < w {
                visit(index + 1);
            }
            if y > 0 {
                visit(index - w);
            }
            if y + 1 < h {
                visit(index + w);
            }
        }

        let count = indices.len() as f64;
        blobs.push(Blob {
            bounds: ImageRegion::new(
                min_x as u32,
                min_y as u32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            ),
            centroid: (sum_x / count, sum_y / count),
            indices,
        });
    }

    blobs
}
