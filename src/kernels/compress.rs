use super::Input;
use crate::config::OpConfig;
use crate::element::Element;
use crate::error::Result;
use crate::operand::ArrayView;
use crate::resolve::CompressCall;

/// Reads `view` in full, copying it first when it shares memory with `out`.
fn detached<'v, T: Element>(
    view: &'v ArrayView<'_>,
    out: &ArrayView<'_>,
    len: usize,
) -> Result<Input<'v, T>> {
    let values = view.slice::<T>(len)?;
    if view.overlaps(out) {
        Ok(Input::Owned(values.to_vec()))
    } else {
        Ok(Input::Borrowed(values))
    }
}

/// Copies each data element whose selector entry is non-zero into `out`,
/// reusing the selector cyclically. Stops when `out` is full and returns the
/// number of elements written.
pub(crate) fn compress_cell<T: Element>(
    call: &mut CompressCall<'_>,
    _config: &OpConfig,
) -> Result<usize> {
    let CompressCall {
        desc,
        data,
        out,
        selector,
    } = call;
    let selector_len = selector.len();
    let data = detached::<T>(data, out, desc.len)?;
    let selector = detached::<T>(selector, out, selector_len)?;
    let capacity = out.len();
    let dest = out.slice_mut::<T>(capacity)?;

    let mut written = 0;
    let mut position = 0;
    for index in 0..desc.len {
        if written == capacity {
            break;
        }
        if selector.at(dest, position) != T::zero() {
            dest[written] = data.at(dest, index);
            written += 1;
        }
        position += 1;
        if position == selector_len {
            position = 0;
        }
    }
    tracing::trace!(written, capacity, "compress finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve;

    #[test]
    fn selector_repeats_over_longer_data() {
        let mut data = [1i16, 2, 3, 4, 5, 6];
        let mut out = [0i16; 6];
        let mut selector = [1i16, 0];
        let config = OpConfig::default();
        let mut call = resolve::compress(
            (&mut data).into(),
            (&mut out).into(),
            (&mut selector).into(),
            &config,
        )
        .unwrap();
        assert_eq!(compress_cell::<i16>(&mut call, &config), Ok(3));
        drop(call);
        assert_eq!(out, [1, 3, 5, 0, 0, 0]);
    }

    #[test]
    fn a_full_output_stops_the_copy() {
        let mut data = [1.0f64, 2.0, 3.0, 4.0];
        let mut out = [0.0f64; 2];
        let mut selector = [1.0f64];
        let config = OpConfig::default();
        let mut call = resolve::compress(
            (&mut data).into(),
            (&mut out).into(),
            (&mut selector).into(),
            &config,
        )
        .unwrap();
        assert_eq!(compress_cell::<f64>(&mut call, &config), Ok(2));
        drop(call);
        assert_eq!(out, [1.0, 2.0]);
    }
}
