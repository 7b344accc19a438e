//! 3x3 rotation matrices in row-vector convention (`v' = v * M`).
//!
//! Euler angles follow the rotateXYZ operator order: X is applied first,
//! then Y, then Z, so the composite is `Rx * Ry * Rz`.

/// A 3x3 matrix stored row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3(pub [[f64; 3]; 3]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub fn rotation_x(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Mat3([[1.0, 0.0, 0.0], [0.0, c, s], [0.0, -s, c]])
    }

    pub fn rotation_y(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Mat3([[c, 0.0, -s], [0.0, 1.0, 0.0], [s, 0.0, c]])
    }

    pub fn rotation_z(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Mat3([[c, s, 0.0], [-s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Local-to-world rotation for a rotateXYZ triple in degrees.
    pub fn from_euler_xyz_degrees(rotation: [f64; 3]) -> Self {
        Self::rotation_x(rotation[0])
            .mul(&Self::rotation_y(rotation[1]))
            .mul(&Self::rotation_z(rotation[2]))
    }

    pub fn mul(&self, other: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.0[i][k] * other.0[k][j]).sum();
            }
        }
        Mat3(out)
    }

    pub fn transpose(&self) -> Mat3 {
        let m = &self.0;
        Mat3([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Row vector times matrix.
    pub fn transform(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        [
            v[0] * m[0][0] + v[1] * m[1][0] + v[2] * m[2][0],
            v[0] * m[0][1] + v[1] * m[1][1] + v[2] * m[2][1],
            v[0] * m[0][2] + v[1] * m[1][2] + v[2] * m[2][2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: [f64; 3], b: [f64; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_identity_transform() {
        assert_eq!(Mat3::IDENTITY.transform([1.0, -2.0, 3.0]), [1.0, -2.0, 3.0]);
        assert_eq!(Mat3::from_euler_xyz_degrees([0.0; 3]), Mat3::IDENTITY);
    }

    #[test]
    fn test_axis_rotations_are_right_handed() {
        assert_close(Mat3::rotation_z(90.0).transform([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
        assert_close(Mat3::rotation_x(90.0).transform([0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_close(Mat3::rotation_y(90.0).transform([0.0, 0.0, 1.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_upright_camera_looks_along_y() {
        // Camera looks down its local -Z; tilting it 90 degrees about X
        // makes it look horizontally along world +Y in a Z-up scene.
        let m = Mat3::from_euler_xyz_degrees([90.0, 0.0, 0.0]);
        assert_close(m.transform([0.0, 0.0, -1.0]), [0.0, 1.0, 0.0]);
        assert_close(m.transform([0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_transpose_inverts_rotation() {
        let m = Mat3::from_euler_xyz_degrees([30.0, 10.0, -75.0]);
        let v = [12.0, -4.0, 7.5];
        assert_close(m.transpose().transform(m.transform(v)), v);
    }
}
