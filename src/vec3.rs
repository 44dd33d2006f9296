// src/vec3.rs
//
// Free functions on `[f64; 3]`: spins, bond vectors, normals.

#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Right-handed `a x b`.
#[inline]
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    let [ax, ay, az] = a;
    let [bx, by, bz] = b;
    [ay * bz - az * by, az * bx - ax * bz, ax * by - ay * bx]
}

#[inline]
pub fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// out += s * a
#[inline]
pub fn add_scaled(out: &mut [f64; 3], a: [f64; 3], s: f64) {
    out[0] += s * a[0];
    out[1] += s * a[1];
    out[2] += s * a[2];
}

#[inline]
pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Unit vector along `v`; the zero vector maps to +z.
#[inline]
pub fn normalize(v: [f64; 3]) -> [f64; 3] {
    match norm(v) {
        len if len > 0.0 => scale(v, len.recip()),
        _ => [0.0, 0.0, 1.0],
    }
}

/// Linear combination a*u + b*v + c*w (used for Bravais-vector arithmetic).
#[inline]
pub fn combine(a: f64, u: [f64; 3], b: f64, v: [f64; 3], c: f64, w: [f64; 3]) -> [f64; 3] {
    [
        a * u[0] + b * v[0] + c * w[0],
        a * u[1] + b * v[1] + c * w[1],
        a * u[2] + b * v[2] + c * w[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(cross([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]), [0.0, 0.0, -1.0]);
    }

    #[test]
    fn normalize_zero_falls_back_to_z() {
        assert_eq!(normalize([0.0, 0.0, 0.0]), [0.0, 0.0, 1.0]);
        let n = normalize([3.0, 0.0, 4.0]);
        assert!((norm(n) - 1.0).abs() < 1e-15);
    }
}
