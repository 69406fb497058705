#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// A poisoned lock is recovered: the heap is only ever mutated through
/// single-step operations that leave it consistent.
///
/// ```rust, ignore
///  let data = read_lock!(my_rwlock);
///  println!("{}", data.len());
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut data = write_lock!(my_rwlock);
///  data.push_back(item);
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
