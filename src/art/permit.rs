//! Lock permits held while walking the tree.
//!
//! Readers hold [`Shared`] permits, owned so a lookup can swap the parent's
//! for the child's inside a loop. Writers descend holding [`Upgradable`]
//! permits, acquiring the child's before releasing the parent's, and only
//! [`escalate`] to [`Exclusive`] at the node they modify. All permits are
//! taken top-down, so a frame never waits on a lock held by a frame above it.

use parking_lot::{ArcRwLockReadGuard, RawRwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};

use super::node::Node;

pub(crate) type Shared<V> = ArcRwLockReadGuard<RawRwLock, Node<V>>;
pub(crate) type Upgradable<'a, V> = RwLockUpgradableReadGuard<'a, Node<V>>;
pub(crate) type Exclusive<'a, V> = RwLockWriteGuard<'a, Node<V>>;

/// Upgrade to exclusive, waiting for current shared holders to leave.
#[inline]
pub(crate) fn escalate<V>(permit: Upgradable<'_, V>) -> Exclusive<'_, V> {
    RwLockUpgradableReadGuard::upgrade(permit)
}

/// Give up exclusivity but keep other writers out.
#[inline]
pub(crate) fn relax<V>(permit: Exclusive<'_, V>) -> Upgradable<'_, V> {
    RwLockWriteGuard::downgrade_to_upgradable(permit)
}
