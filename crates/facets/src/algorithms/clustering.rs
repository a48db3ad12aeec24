//! Weighted k-means over color vectors.

use crate::random::Random;

/// A weighted point in clustering space carrying an opaque tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T = ()> {
    pub values: Vec<f64>,
    pub weight: f64,
    pub tag: T,
}

impl<T> Vector<T> {
    pub fn new(values: Vec<f64>, weight: f64, tag: T) -> Self {
        Self {
            values,
            weight,
            tag,
        }
    }

    pub fn distance_to<U>(&self, other: &Vector<U>) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl Vector {
    pub fn untagged(values: Vec<f64>) -> Self {
        Self::new(values, 1.0, ())
    }

    /// Weight-normalized mean of `points`.
    ///
    /// # Panics
    /// If `points` is empty.
    pub fn average<'a, T: 'a>(points: impl IntoIterator<Item = &'a Vector<T>>) -> Vector {
        let mut points = points.into_iter().peekable();
        let dims = match points.peek() {
            Some(first) => first.values.len(),
            None => panic!("can't average 0 vectors"),
        };
        let mut values = vec![0.0; dims];
        let mut weight_sum = 0.0;
        for point in points {
            weight_sum += point.weight;
            for (sum, value) in values.iter_mut().zip(&point.values) {
                *sum += point.weight * value;
            }
        }
        for value in &mut values {
            *value /= weight_sum;
        }
        Vector::untagged(values)
    }
}

#[derive(Debug, Clone)]
pub struct KMeans<T> {
    points: Vec<Vector<T>>,
    centroids: Vec<Vector>,
    clusters: Vec<Vec<usize>>,
    iteration: usize,
    delta: f64,
}

impl<T> KMeans<T> {
    /// Seeds `k` centroids by drawing input points with replacement.
    pub fn new(points: Vec<Vector<T>>, k: usize, random: &mut Random) -> Self {
        let centroids = if points.is_empty() {
            Vec::new()
        } else {
            (0..k)
                .map(|_| {
                    let idx = ((points.len() as f64 * random.next()) as usize).min(points.len() - 1);
                    Vector::untagged(points[idx].values.clone())
                })
                .collect()
        };
        Self::with_centroids(points, centroids)
    }

    pub fn with_centroids(points: Vec<Vector<T>>, centroids: Vec<Vector>) -> Self {
        Self {
            clusters: vec![Vec::new(); centroids.len()],
            points,
            centroids,
            iteration: 0,
            delta: 0.0,
        }
    }

    /// One assignment + update round.
    pub fn step(&mut self) {
        for cluster in &mut self.clusters {
            cluster.clear();
        }

        for (idx, point) in self.points.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (k, centroid) in self.centroids.iter().enumerate() {
                let distance = centroid.distance_to(point);
                if best.is_none_or(|(_, min)| distance < min) {
                    best = Some((k, distance));
                }
            }
            if let Some((k, _)) = best {
                self.clusters[k].push(idx);
            }
        }

        let mut delta = 0.0;
        for (centroid, members) in self.centroids.iter_mut().zip(&self.clusters) {
            if members.is_empty() {
                continue;
            }
            let average = Vector::average(members.iter().map(|&idx| &self.points[idx]));
            delta += centroid.distance_to(&average);
            *centroid = average;
        }

        self.delta = delta;
        self.iteration += 1;
    }

    /// Summed centroid displacement of the last step.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn centroids(&self) -> &[Vector] {
        &self.centroids
    }

    /// Point indices per centroid from the last step.
    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }

    pub fn points(&self) -> &[Vector<T>] {
        &self.points
    }
}
