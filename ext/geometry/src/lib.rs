//! Plane figures, with their API derived by sumgen from `shapes.sum`.
//!
//! ```
//! use sumgen_geometry::geometry::Shape;
//!
//! let shape = Shape::new_rectangle(2.0, 3.0);
//! assert_eq!(shape.fold(|_| 0.0, |r| r.width * r.height, |_| 0.0), 6.0);
//! ```

include!(concat!(env!("OUT_DIR"), "/shapes.rs"));

impl geometry::Shape {
    /// Area of the figure.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.fold(
            |c| std::f64::consts::PI * c.radius * c.radius,
            |r| r.width * r.height,
            |t| 0.5 * t.base * t.height,
        )
    }
}
