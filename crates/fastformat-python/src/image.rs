//! PyImage and the `image` submodule functions.
//!
//! All FFI calls release the GIL via `py.detach()`. Pointers cross into
//! the detached closures as `usize` so the closures stay `Send`.

use std::ffi::{c_char, CString};

use numpy::{PyArray1, PyArray3, PyArrayMethods};
use pyo3::prelude::*;

use fastformat_core::ColorSpace;
use fastformat_ffi::{
    ff_image_as_ptr, ff_image_color_space, ff_image_convert, ff_image_destroy,
    ff_image_from_arrow, ff_image_height, ff_image_into_arrow, ff_image_name, ff_image_new,
    ff_image_ownership, ff_image_read, ff_image_view_from_raw_data, ff_image_width,
    ff_record_destroy, FfColorSpace, FfOwnership, FfStatus,
};

use crate::arrow::{export_record, import_array, RawData};
use crate::error::check_status;

/// A typed image: pixel bytes plus width, height, color space and name.
///
/// Owned images hold a reference to their pixel buffer. Views made with
/// `view_from_raw_data()` borrow a `RawData`'s pixels and keep it alive.
/// `into_*` conversions and `into_arrow()` consume the image.
#[pyclass(name = "Image")]
pub(crate) struct Image {
    handle: Option<u64>,
    source: Option<Py<RawData>>,
}

#[pymethods]
impl Image {
    /// The image name, or None if unnamed.
    fn name(&self, py: Python<'_>) -> PyResult<Option<String>> {
        let h = self.require_handle()?;
        // Release GIL: ff_image_name locks IMAGES.
        let (status, bytes) = py.detach(|| {
            let mut len = 0usize;
            let s = ff_image_name(h, std::ptr::null_mut(), 0, &mut len);
            if s != FfStatus::BufferTooSmall as i32 {
                return (s, Vec::new());
            }
            let mut buf = vec![0u8; len + 1];
            let s = ff_image_name(h, buf.as_mut_ptr().cast::<c_char>(), buf.len(), &mut len);
            buf.truncate(len);
            (s, buf)
        });
        check_status(status)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    /// Width in pixels.
    fn width(&self, py: Python<'_>) -> PyResult<u32> {
        let h = self.require_handle()?;
        let (status, w) = py.detach(|| {
            let mut w = 0u32;
            let s = ff_image_width(h, &mut w);
            (s, w)
        });
        check_status(status)?;
        Ok(w)
    }

    /// Height in pixels.
    fn height(&self, py: Python<'_>) -> PyResult<u32> {
        let h = self.require_handle()?;
        let (status, height) = py.detach(|| {
            let mut height = 0u32;
            let s = ff_image_height(h, &mut height);
            (s, height)
        });
        check_status(status)?;
        Ok(height)
    }

    /// Pixel layout tag, e.g. `"BGR8"`.
    fn color_space(&self, py: Python<'_>) -> PyResult<&'static str> {
        Ok(self.layout(py)?.as_str())
    }

    /// `"owned"` or `"borrowed"`.
    fn ownership(&self, py: Python<'_>) -> PyResult<&'static str> {
        let h = self.require_handle()?;
        let (status, tag) = py.detach(|| {
            let mut tag = -1i32;
            let s = ff_image_ownership(h, &mut tag);
            (s, tag)
        });
        check_status(status)?;
        Ok(if tag == FfOwnership::Borrowed as i32 {
            "borrowed"
        } else {
            "owned"
        })
    }

    /// Address of the first pixel byte. Read only; valid while the image
    /// is alive.
    fn as_ptr(&self, py: Python<'_>) -> PyResult<usize> {
        Ok(self.address(py)?.0)
    }

    /// Convert to RGB8, consuming this image.
    fn into_rgb8(&mut self, py: Python<'_>) -> PyResult<Image> {
        self.convert(py, ColorSpace::Rgb8)
    }

    /// Convert to BGR8, consuming this image.
    fn into_bgr8(&mut self, py: Python<'_>) -> PyResult<Image> {
        self.convert(py, ColorSpace::Bgr8)
    }

    /// Convert to GRAY8, consuming this image.
    fn into_gray8(&mut self, py: Python<'_>) -> PyResult<Image> {
        self.convert(py, ColorSpace::Gray8)
    }

    /// Convert to RGBA8, consuming this image.
    fn into_rgba8(&mut self, py: Python<'_>) -> PyResult<Image> {
        self.convert(py, ColorSpace::Rgba8)
    }

    /// Convert to BGRA8, consuming this image.
    fn into_bgra8(&mut self, py: Python<'_>) -> PyResult<Image> {
        self.convert(py, ColorSpace::Bgra8)
    }

    /// Hand the image to pyarrow as a `pyarrow.Array`, consuming it.
    ///
    /// The array is a dense union with `width`, `height`, `encoding`,
    /// `name` and `data` fields. Its `data` child is the image's pixel
    /// buffer; nothing is copied.
    fn into_arrow<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let h = self.require_handle()?;
        // Release GIL: ff_image_into_arrow locks IMAGES then RECORDS.
        let (status, record) = py.detach(|| {
            let mut record = 0u64;
            let s = ff_image_into_arrow(h, &mut record);
            if s == 0 {
                ff_image_destroy(h);
            }
            (s, record)
        });
        check_status(status)?;
        self.handle = None;
        self.source = None;
        let array = export_record(py, record);
        // The exported array holds its own reference to the pixels.
        py.detach(|| ff_record_destroy(record));
        array
    }

    /// Copy the pixels into a `(height, width, channels)` uint8 array.
    fn to_numpy<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let h = self.require_handle()?;
        let channels = self.layout(py)?.channels();
        let (width, height) = (self.width(py)? as usize, self.height(py)? as usize);
        let (_, len) = self.address(py)?;
        let mut pixels = vec![0u8; len];
        let dst = pixels.as_mut_ptr() as usize;
        // Release GIL: ff_image_read locks IMAGES.
        let status = py.detach(|| {
            let mut written = 0usize;
            ff_image_read(h, dst as *mut u8, len, &mut written)
        });
        check_status(status)?;
        PyArray1::from_vec(py, pixels).reshape([height, width, channels])
    }

    /// Explicitly destroy the image handle.
    fn destroy(&mut self, py: Python<'_>) {
        self.do_destroy_with_gil(py);
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc_val=None, _exc_tb=None))]
    fn __exit__(
        &mut self,
        py: Python<'_>,
        _exc_type: Option<&Bound<'_, PyAny>>,
        _exc_val: Option<&Bound<'_, PyAny>>,
        _exc_tb: Option<&Bound<'_, PyAny>>,
    ) {
        self.do_destroy_with_gil(py);
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let described = (|| -> PyResult<String> {
            Ok(format!(
                "Image(width={}, height={}, color_space={:?}, name={:?})",
                self.width(py)?,
                self.height(py)?,
                self.color_space(py)?,
                self.name(py)?,
            ))
        })();
        described.unwrap_or_else(|_| "Image(consumed)".to_string())
    }
}

impl Image {
    fn require_handle(&self) -> PyResult<u64> {
        self.handle.ok_or_else(|| {
            pyo3::exceptions::PyRuntimeError::new_err("Image already consumed or destroyed")
        })
    }

    fn layout(&self, py: Python<'_>) -> PyResult<ColorSpace> {
        let h = self.require_handle()?;
        let (status, tag) = py.detach(|| {
            let mut tag = -1i32;
            let s = ff_image_color_space(h, &mut tag);
            (s, tag)
        });
        check_status(status)?;
        u8::try_from(tag)
            .ok()
            .and_then(ColorSpace::from_tag)
            .ok_or_else(|| pyo3::exceptions::PyRuntimeError::new_err("unknown color space tag"))
    }

    fn address(&self, py: Python<'_>) -> PyResult<(usize, usize)> {
        let h = self.require_handle()?;
        let (status, addr, len) = py.detach(|| {
            let mut ptr: *const u8 = std::ptr::null();
            let mut len = 0usize;
            let s = ff_image_as_ptr(h, &mut ptr, &mut len);
            (s, ptr as usize, len)
        });
        check_status(status)?;
        Ok((addr, len))
    }

    /// Consume this image into `dst`. On failure the image is untouched.
    fn convert(&mut self, py: Python<'_>, dst: ColorSpace) -> PyResult<Image> {
        let h = self.require_handle()?;
        let tag = FfColorSpace::from(dst) as i32;
        // Release GIL: ff_image_convert locks IMAGES, then RECORDS for views.
        let (status, out, borrowed) = py.detach(|| {
            let mut out = 0u64;
            let s = ff_image_convert(h, tag, &mut out);
            if s != 0 {
                return (s, 0, false);
            }
            // The source slot is consumed; free it.
            ff_image_destroy(h);
            let mut own = -1i32;
            ff_image_ownership(out, &mut own);
            (s, out, own == FfOwnership::Borrowed as i32)
        });
        check_status(status)?;
        self.handle = None;
        let source = self.source.take();
        Ok(Image {
            handle: Some(out),
            source: if borrowed { source } else { None },
        })
    }

    fn do_destroy_with_gil(&mut self, py: Python<'_>) {
        if let Some(h) = self.handle.take() {
            // Release GIL: ff_image_destroy locks IMAGES.
            py.detach(|| ff_image_destroy(h));
        }
        self.source = None;
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            Python::attach(|py| {
                py.detach(|| ff_image_destroy(h));
            });
        }
    }
}

fn new_image(
    py: Python<'_>,
    data: Vec<u8>,
    width: u32,
    height: u32,
    color_space: ColorSpace,
    name: Option<&str>,
) -> PyResult<Image> {
    let cname = name
        .map(CString::new)
        .transpose()
        .map_err(|_| pyo3::exceptions::PyValueError::new_err("name contains a NUL byte"))?;
    let name_addr = cname.as_ref().map_or(0, |c| c.as_ptr() as usize);
    let data_addr = data.as_ptr() as usize;
    let len = data.len();
    let tag = FfColorSpace::from(color_space) as i32;
    // Release GIL: ff_image_new copies the pixels and locks IMAGES.
    let (status, h) = py.detach(|| {
        let mut h = 0u64;
        let s = ff_image_new(
            data_addr as *const u8,
            len,
            width,
            height,
            tag,
            name_addr as *const c_char,
            &mut h,
        );
        (s, h)
    });
    check_status(status)?;
    Ok(Image {
        handle: Some(h),
        source: None,
    })
}

/// Create a BGR8 image (3 bytes per pixel).
#[pyfunction]
#[pyo3(signature = (data, width, height, name=None))]
fn new_bgr8(
    py: Python<'_>,
    data: Vec<u8>,
    width: u32,
    height: u32,
    name: Option<&str>,
) -> PyResult<Image> {
    new_image(py, data, width, height, ColorSpace::Bgr8, name)
}

/// Create an RGB8 image (3 bytes per pixel).
#[pyfunction]
#[pyo3(signature = (data, width, height, name=None))]
fn new_rgb8(
    py: Python<'_>,
    data: Vec<u8>,
    width: u32,
    height: u32,
    name: Option<&str>,
) -> PyResult<Image> {
    new_image(py, data, width, height, ColorSpace::Rgb8, name)
}

/// Create a GRAY8 image (1 byte per pixel).
#[pyfunction]
#[pyo3(signature = (data, width, height, name=None))]
fn new_gray8(
    py: Python<'_>,
    data: Vec<u8>,
    width: u32,
    height: u32,
    name: Option<&str>,
) -> PyResult<Image> {
    new_image(py, data, width, height, ColorSpace::Gray8, name)
}

/// Create an RGBA8 image (4 bytes per pixel).
#[pyfunction]
#[pyo3(signature = (data, width, height, name=None))]
fn new_rgba8(
    py: Python<'_>,
    data: Vec<u8>,
    width: u32,
    height: u32,
    name: Option<&str>,
) -> PyResult<Image> {
    new_image(py, data, width, height, ColorSpace::Rgba8, name)
}

/// Create a BGRA8 image (4 bytes per pixel).
#[pyfunction]
#[pyo3(signature = (data, width, height, name=None))]
fn new_bgra8(
    py: Python<'_>,
    data: Vec<u8>,
    width: u32,
    height: u32,
    name: Option<&str>,
) -> PyResult<Image> {
    new_image(py, data, width, height, ColorSpace::Bgra8, name)
}

/// Import a pyarrow array made by `Image.into_arrow()` and borrow its
/// pixel column without copying.
#[pyfunction]
fn raw_data(py: Python<'_>, array: &Bound<'_, PyAny>) -> PyResult<RawData> {
    let record = import_array(py, array)?;
    RawData::new(py, record)
}

/// A borrowed image over `raw`'s pixels. `as_ptr()` equals `raw.as_ptr()`.
#[pyfunction]
fn view_from_raw_data(py: Python<'_>, raw: Py<RawData>) -> PyResult<Image> {
    let record = raw.get().record_handle();
    let (status, h) = py.detach(|| {
        let mut h = 0u64;
        let s = ff_image_view_from_raw_data(record, &mut h);
        (s, h)
    });
    check_status(status)?;
    Ok(Image {
        handle: Some(h),
        source: Some(raw),
    })
}

/// An owned image sharing `raw`'s pixel buffer.
#[pyfunction]
fn from_raw_data(py: Python<'_>, raw: PyRef<'_, RawData>) -> PyResult<Image> {
    decode(py, raw.record_handle())
}

/// Decode a pyarrow array into an owned image sharing its pixel buffer.
///
/// The buffer stays owned by pyarrow, so conversions of the result copy.
#[pyfunction]
fn from_arrow(py: Python<'_>, array: &Bound<'_, PyAny>) -> PyResult<Image> {
    let record = import_array(py, array)?;
    let image = decode(py, record);
    py.detach(|| ff_record_destroy(record));
    image
}

fn decode(py: Python<'_>, record: u64) -> PyResult<Image> {
    // Release GIL: ff_image_from_arrow locks RECORDS then IMAGES.
    let (status, h) = py.detach(|| {
        let mut h = 0u64;
        let s = ff_image_from_arrow(record, &mut h);
        (s, h)
    });
    check_status(status)?;
    Ok(Image {
        handle: Some(h),
        source: None,
    })
}

/// Populate the `image` submodule.
pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Image>()?;
    m.add_function(wrap_pyfunction!(new_bgr8, m)?)?;
    m.add_function(wrap_pyfunction!(new_rgb8, m)?)?;
    m.add_function(wrap_pyfunction!(new_gray8, m)?)?;
    m.add_function(wrap_pyfunction!(new_rgba8, m)?)?;
    m.add_function(wrap_pyfunction!(new_bgra8, m)?)?;
    m.add_function(wrap_pyfunction!(raw_data, m)?)?;
    m.add_function(wrap_pyfunction!(view_from_raw_data, m)?)?;
    m.add_function(wrap_pyfunction!(from_raw_data, m)?)?;
    m.add_function(wrap_pyfunction!(from_arrow, m)?)?;
    Ok(())
}
