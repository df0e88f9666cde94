use crate::{
    HybridAllocation, NativeAllocation, PinnedArrayAllocation, Window, WindowOwner, heap,
};

fn sum_window<O: WindowOwner<i32>>(owner: &O) -> i64 {
    unsafe { owner.window().iter() }.map(|&x| x as i64).sum()
}

#[test]
fn test_native_zeroed_int32() {
    let alloc = NativeAllocation::<i32>::new(10, true, 0).unwrap();
    assert_eq!(alloc.window().len(), 10);
    assert_eq!(alloc.as_slice(), &[0; 10]);
}

#[test]
fn test_pinned_int32_aligned_64() {
    let alloc = PinnedArrayAllocation::<i32>::new(100, false, 64).unwrap();
    assert_eq!(alloc.window().addr() % 64, 0);
    assert_eq!(alloc.window().len(), 100);
    assert!(alloc.array_length() >= 100 + 15);
}

#[test]
fn test_hybrid_branches() {
    let mut short = vec![0i32; 5];
    let hybrid = HybridAllocation::new_in(&mut short, 10, false, 0).unwrap();
    assert!(hybrid.owns_allocation());
    assert_eq!(hybrid.window().len(), 10);
    drop(hybrid);

    let mut long = vec![0i32; 20];
    let hybrid = HybridAllocation::new_in(&mut long, 10, false, 0).unwrap();
    assert!(!hybrid.owns_allocation());
}

#[test]
fn test_owners_are_interchangeable() {
    let native = NativeAllocation::<i32>::copy_from_slice(&[1, 2, 3, 4], 16).unwrap();
    let mut pinned = PinnedArrayAllocation::<i32>::new(4, true, 16).unwrap();
    pinned.as_mut_slice().copy_from_slice(&[10, 20, 30, 40]);
    let mut buf = [100, 200, 300, 400];
    let hybrid = HybridAllocation::new_in(&mut buf, 4, false, 0).unwrap();

    assert_eq!(sum_window(&native), 10);
    assert_eq!(sum_window(&pinned), 100);
    assert_eq!(sum_window(&hybrid), 1000);
    assert_eq!(native.window_len(), 4);
    assert!(pinned.is_aligned_to(16));
}

#[test]
fn test_cast_native_window_to_bytes() {
    let alloc = NativeAllocation::<u32>::from_value(6, 0xAABB_CCDD, 64).unwrap();
    let bytes = alloc.window().cast::<u8>();
    assert_eq!(bytes.len(), 24);
    assert_eq!(bytes.addr(), alloc.window().addr());
    let view = unsafe { bytes.as_slice() };
    assert_eq!(view, bytemuck::cast_slice::<u32, u8>(alloc.as_slice()));

    let wide = alloc.window().cast::<u64>();
    assert_eq!(wide.len(), 3);
    let odd = alloc.window().slice_to(5).cast::<u64>();
    assert_eq!(odd.len(), 2);
}

#[test]
fn test_window_slices_of_pinned_array() {
    let mut alloc = PinnedArrayAllocation::<u16>::new(64, false, 32).unwrap();
    for (i, slot) in alloc.as_uninit_slice_mut().iter_mut().enumerate() {
        slot.write(i as u16);
    }
    unsafe { alloc.assume_init() };

    let w = alloc.window();
    let middle = w.slice(16, 16);
    assert!(middle.is_aligned_to(32));
    let values: Vec<u16> = unsafe { middle.iter() }.copied().collect();
    assert_eq!(values, (16..32).collect::<Vec<u16>>());
}

#[test]
fn test_window_over_foreign_memory() {
    let mut data: Vec<u8> = (0..64).map(|_| fastrand::u8(..)).collect();
    let expected = data.clone();
    let w = Window::from_mut_slice(&mut data);
    let copy = NativeAllocation::copy_from_slice(unsafe { w.as_slice() }, 0).unwrap();
    assert_eq!(copy.as_slice(), expected.as_slice());
}

#[test]
fn test_natural_alignment_is_power_of_two() {
    assert!(heap::natural_alignment().is_power_of_two());
    assert!(heap::natural_alignment() >= std::mem::align_of::<u64>());
}

#[test]
fn test_allocations_on_other_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let mut alloc = NativeAllocation::<u64>::new(1000, false, 64).unwrap();
                alloc.fill(i);
                alloc.iter().sum::<u64>()
            })
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), i as u64 * 1000);
    }
}

#[test]
fn test_allocation_sent_to_other_thread_is_freed_there() {
    let alloc = NativeAllocation::<u32>::from_value(16, 1, 0).unwrap();
    let sum = std::thread::spawn(move || alloc.iter().sum::<u32>())
        .join()
        .unwrap();
    assert_eq!(sum, 16);
}

#[cfg(any(debug_assertions, feature = "ledger"))]
mod ledger_tests {
    use super::*;
    use crate::ledger;

    #[test]
    fn test_hybrid_reuse_and_fallback_ledger_counts() {
        let mut short = vec![0u8; 5];
        let mut long = vec![0u8; 20];

        let before = ledger::thread_stats();
        let reuse = HybridAllocation::new_in(&mut long, 10, false, 0).unwrap();
        drop(reuse);
        let after_reuse = ledger::thread_stats().since(before);
        assert_eq!(after_reuse.allocated, 0);
        assert_eq!(after_reuse.released, 0);

        let fallback = HybridAllocation::new_in(&mut short, 10, false, 0).unwrap();
        let addr = fallback.window().addr();
        assert!(ledger::is_live(addr));
        drop(fallback);
        let delta = ledger::thread_stats().since(before);
        assert_eq!(delta.allocated, 1);
        assert_eq!(delta.released, 1);
        assert_eq!(short, vec![0; 5]);
    }

    #[test]
    fn test_pinned_arrays_are_not_native_allocations() {
        let before = ledger::thread_stats();
        let alloc = PinnedArrayAllocation::<u32>::new(32, true, 64).unwrap();
        assert!(!ledger::is_live(alloc.window().addr()));
        drop(alloc);
        assert_eq!(ledger::thread_stats().since(before).allocated, 0);
    }
}
