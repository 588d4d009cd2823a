//! Opaque ID newtypes for nets, pins and devices.
//!
//! IDs are handed out by the [`NetlistBuilder`](crate::builder::NetlistBuilder)
//! in allocation order and stay valid for the lifetime of the simulator.

use nlsim_common::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// A single logic signal shared by one or more pins.
    NetId
);

define_id!(
    /// A named terminal owned by exactly one device.
    PinId
);

define_id!(
    /// A device instance; also its evaluation order within a delta cycle.
    DeviceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        assert_eq!(NetId::from_raw(7).as_raw(), 7);
        assert_eq!(<PinId as ArenaId>::from_raw(3), PinId::from_raw(3));
    }

    #[test]
    fn device_ids_order_by_allocation() {
        let mut ids = vec![
            DeviceId::from_raw(2),
            DeviceId::from_raw(0),
            DeviceId::from_raw(1),
        ];
        ids.sort();
        assert_eq!(ids, vec![DeviceId(0), DeviceId(1), DeviceId(2)]);
    }
}
