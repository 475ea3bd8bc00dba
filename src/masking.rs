use static_assertions::const_assert_eq;

use crate::grid::VoxelGrid;

/// Scalar type of mask voxels. Values are restricted to {0, 1}.
pub type MaskValue = u8;

// The mask is the largest persistent allocation after the volumes
// themselves; it must stay a 1-byte scalar.
const_assert_eq!(std::mem::size_of::<MaskValue>(), 1);

/// Which side of the mask gets painted with the fill value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MaskOperation {
    /// Overwrite voxels where the mask is set.
    Inside,
    /// Overwrite the complement, voxels where the mask is clear.
    Outside,
}

/// Paints `fill_value` into the working volume under the mask policy: every
/// voxel where `mask == 1` for [`MaskOperation::Inside`], every voxel where
/// `mask == 0` for [`MaskOperation::Outside`].
///
/// Runs one linear sweep over the two contiguous buffers with no
/// intermediate copies.
///
/// # Panics
/// Panics if volume and mask don't share identical geometry. The mask is
/// constructed with the working volume's geometry, so a mismatch is
/// programmer error and not recoverable.
pub fn apply_mask<T: Copy>(
    volume: &mut VoxelGrid<T>,
    mask: &VoxelGrid<MaskValue>,
    operation: MaskOperation,
    fill_value: T,
) {
    assert_eq!(
        volume.geometry(),
        mask.geometry(),
        "Volume and mask must share identical geometry"
    );

    match operation {
        MaskOperation::Inside => {
            for (sample, mask_value) in volume.values_mut().iter_mut().zip(mask.values()) {
                if *mask_value != 0 {
                    *sample = fill_value;
                }
            }
        }
        MaskOperation::Outside => {
            for (sample, mask_value) in volume.values_mut().iter_mut().zip(mask.values()) {
                if *mask_value == 0 {
                    *sample = fill_value;
                }
            }
        }
    }
}

/// Restores the original samples everywhere the mask is set, then zeroes the
/// entire mask.
///
/// This is the only undo mechanism; there is no multi-step undo stack.
///
/// # Panics
/// Panics if the three grids don't share identical geometry.
pub fn reset_volume<T: Copy>(
    working: &mut VoxelGrid<T>,
    original: &VoxelGrid<T>,
    mask: &mut VoxelGrid<MaskValue>,
) {
    assert_eq!(
        working.geometry(),
        original.geometry(),
        "Working and original volume must share identical geometry"
    );
    assert_eq!(
        working.geometry(),
        mask.geometry(),
        "Volume and mask must share identical geometry"
    );

    for ((sample, original_sample), mask_value) in working
        .values_mut()
        .iter_mut()
        .zip(original.values())
        .zip(mask.values())
    {
        if *mask_value != 0 {
            *sample = *original_sample;
        }
    }

    mask.fill(0);
}
