use std::f64::consts::PI;
use serde::{Serialize, Deserialize};




/**
 * A uniform rectangular mesh patch in 2D
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredMesh {

    /// Number of zones on the i-axis
    pub ni: i64,

    /// Number of zones on the j-axis
    pub nj: i64,

    /// Left coordinate edge of the domain
    pub x0: f64,

    /// Bottom coordinate edge of the domain
    pub y0: f64,

    /// Zone spacing on the i-axis
    pub dx: f64,

    /// Zone spacing on the j-axis
    pub dy: f64,
}




// ============================================================================
impl StructuredMesh {

    /**
     * Create a square mesh centered on the origin, with the given number of
     * zones on each side.
     */
    pub fn centered_square(domain_radius: f64, resolution: u32) -> Self {
        Self {
            x0: -domain_radius,
            y0: -domain_radius,
            ni: resolution as i64,
            nj: resolution as i64,
            dx: 2.0 * domain_radius / resolution as f64,
            dy: 2.0 * domain_radius / resolution as f64,
        }
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.ni as usize, self.nj as usize]
    }

    pub fn num_total_zones(&self) -> usize {
        (self.ni * self.nj) as usize
    }

    /**
     * Return the [x, y] coordinate of the zone center at a given index.
     * Out-of-bounds indexes are allowed.
     */
    pub fn cell_coordinates(&self, i: i64, j: i64) -> (f64, f64) {
        let x = self.x0 + (i as f64 + 0.5) * self.dx;
        let y = self.y0 + (j as f64 + 0.5) * self.dy;
        (x, y)
    }

    /**
     * Return the [x, y] coordinate of the lower-left vertex of the zone at
     * a given index.
     */
    pub fn vertex_coordinates(&self, i: i64, j: i64) -> (f64, f64) {
        let x = self.x0 + i as f64 * self.dx;
        let y = self.y0 + j as f64 * self.dy;
        (x, y)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ni <= 0 || self.nj <= 0 {
            anyhow::bail!("the mesh zone counts must be positive")
        }
        if self.dx <= 0.0 || self.dy <= 0.0 {
            anyhow::bail!("the mesh zone spacings must be positive")
        }
        Ok(())
    }
}




/**
 * Homologous expansion of a 1D mesh: the comoving face positions y are
 * fixed, and the physical face positions are x = a(t) y, with the scale
 * factor evolving linearly in time.
 */
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleFactor {

    /// Scale factor at t = 0
    pub a0: f64,

    /// Scale factor derivative (constant)
    pub adot: f64,
}




// ============================================================================
impl ScaleFactor {

    pub fn at(&self, time: f64) -> f64 {
        self.a0 + self.adot * time
    }

    pub fn rate(&self) -> f64 {
        self.adot
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self { a0: 1.0, adot: 0.0 }
    }
}




/**
 * Enum for the coordinate system of a 1D mesh
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordinates {
    Cartesian = 0,
    Spherical = 1,
}




// ============================================================================
impl Coordinates {

    /// The volume of a zone spanning the physical positions [xl, xr]
    pub fn cell_volume(self, xl: f64, xr: f64) -> f64 {
        match self {
            Coordinates::Cartesian => xr - xl,
            Coordinates::Spherical => (xr * xr * xr - xl * xl * xl) * 4.0 * PI / 3.0,
        }
    }

    /// The area of the zone face at physical position x
    pub fn face_area(self, x: f64) -> f64 {
        match self {
            Coordinates::Cartesian => 1.0,
            Coordinates::Spherical => 4.0 * PI * x * x,
        }
    }
}
