//! Curve points and scalars

use super::{bytes, curve, outputs};
use crate::engine;
use crate::handles::{PointHandle, ScalarHandle};
use crate::mem::CMem;
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::ops;
use std::os::raw::c_int;

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_curve_random_scalar(
    curve_nid: c_int,
    out: *mut ScalarHandle,
) -> c_int {
    ffi_call("mpcb_curve_random_scalar", || {
        require_out(out, "scalar")?;
        let scalar = ops::curve::random_scalar(engine(), curve(curve_nid)?)?;
        write_out(out, ScalarHandle::store(scalar))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_curve_generator(curve_nid: c_int, out: *mut PointHandle) -> c_int {
    ffi_call("mpcb_curve_generator", || {
        require_out(out, "point")?;
        let point = ops::curve::generator(engine(), curve(curve_nid)?)?;
        write_out(out, PointHandle::store(point))
    })
}

/// `scalar * G`
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_curve_mul_generator(
    scalar: ScalarHandle,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_curve_mul_generator", || {
        require_out(out, "point")?;
        let point = ops::curve::mul_generator(engine(), &*scalar.get()?)?;
        write_out(out, PointHandle::store(point))
    })
}

/// Decode a SEC1 point
///
/// # Safety
/// `encoded` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_point_from_bytes(
    curve_nid: c_int,
    encoded: CMem,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_point_from_bytes", || {
        require_out(out, "point")?;
        let point = ops::curve::point_from_bytes(engine(), curve(curve_nid)?, bytes(encoded)?)?;
        write_out(out, PointHandle::store(point))
    })
}

/// Compressed SEC1 encoding
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_point_to_bytes(point: PointHandle, out: *mut CMem) -> c_int {
    ffi_call("mpcb_point_to_bytes", || {
        require_out(out, "encoding")?;
        let encoded = ops::curve::point_to_bytes(&*point.get()?);
        let mut outputs = outputs();
        outputs.mem(out, &encoded)?;
        outputs.commit();
        Ok(())
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_point_add(
    a: PointHandle,
    b: PointHandle,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_point_add", || {
        require_out(out, "point")?;
        let sum = ops::curve::point_add(engine(), &*a.get()?, &*b.get()?)?;
        write_out(out, PointHandle::store(sum))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_point_mul(
    point: PointHandle,
    scalar: ScalarHandle,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_point_mul", || {
        require_out(out, "point")?;
        let product = ops::curve::point_mul(engine(), &*point.get()?, &*scalar.get()?)?;
        write_out(out, PointHandle::store(product))
    })
}

/// Writes 1 for the identity point, 0 otherwise
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_point_is_zero(point: PointHandle, out: *mut c_int) -> c_int {
    ffi_call("mpcb_point_is_zero", || {
        let zero = ops::curve::point_is_zero(&*point.get()?);
        write_out(out, c_int::from(zero))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_point_curve(point: PointHandle, out: *mut c_int) -> c_int {
    ffi_call("mpcb_point_curve", || {
        let point = point.get()?;
        write_out(out, point.curve().nid())
    })
}

/// Decode a big-endian scalar, reduced modulo the group order
///
/// # Safety
/// `encoded` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_scalar_from_bytes(
    curve_nid: c_int,
    encoded: CMem,
    out: *mut ScalarHandle,
) -> c_int {
    ffi_call("mpcb_scalar_from_bytes", || {
        require_out(out, "scalar")?;
        let scalar = ops::curve::scalar_from_bytes(engine(), curve(curve_nid)?, bytes(encoded)?)?;
        write_out(out, ScalarHandle::store(scalar))
    })
}

/// Big-endian encoding; secret, zeroed by `mpcb_cmem_free`
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_scalar_to_bytes(scalar: ScalarHandle, out: *mut CMem) -> c_int {
    ffi_call("mpcb_scalar_to_bytes", || {
        require_out(out, "encoding")?;
        let encoded = ops::curve::scalar_to_bytes(&*scalar.get()?);
        let mut outputs = outputs();
        outputs.mem(out, &encoded)?;
        outputs.commit();
        Ok(())
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_scalar_add(
    a: ScalarHandle,
    b: ScalarHandle,
    out: *mut ScalarHandle,
) -> c_int {
    ffi_call("mpcb_scalar_add", || {
        require_out(out, "scalar")?;
        let sum = ops::curve::scalar_add(engine(), &*a.get()?, &*b.get()?)?;
        write_out(out, ScalarHandle::store(sum))
    })
}
