// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::error::{EnrollError, Result};

/// Hands out peer addresses as fixed offsets from the interface address.
///
/// Peer `n` (1-based) gets `interface address + n`. The result must stay a
/// usable host address of the interface subnet: never the network or
/// broadcast address, never past the end of the subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressAllocator {
	interface: Ipv4Net,
}

impl AddressAllocator {
	pub fn new(interface: Ipv4Net) -> Self {
		Self { interface }
	}

	pub fn interface(&self) -> Ipv4Net {
		self.interface
	}

	pub fn allocate(&self, ordinal: usize) -> Result<Ipv4Addr> {
		let exhausted = || EnrollError::AddressSpaceExhausted {
			subnet: self.interface.trunc().to_string(),
			ordinal,
		};

		let offset = u32::try_from(ordinal)
			.ok()
			.filter(|offset| *offset > 0)
			.ok_or_else(exhausted)?;
		let candidate = u32::from(self.interface.addr())
			.checked_add(offset)
			.map(Ipv4Addr::from)
			.ok_or_else(exhausted)?;

		if !self.interface.contains(&candidate)
			|| candidate == self.interface.network()
			|| candidate == self.interface.broadcast()
		{
			return Err(exhausted());
		}

		Ok(candidate)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn allocator(cidr: &str) -> AddressAllocator {
		AddressAllocator::new(cidr.parse().unwrap())
	}

	#[test]
	fn first_peers_follow_the_interface_address() {
		let alloc = allocator("10.0.0.1/8");
		assert_eq!(alloc.allocate(1).unwrap(), Ipv4Addr::new(10, 0, 0, 2));
		assert_eq!(alloc.allocate(2).unwrap(), Ipv4Addr::new(10, 0, 0, 3));
		assert_eq!(alloc.allocate(255).unwrap(), Ipv4Addr::new(10, 0, 1, 0));
	}

	#[test]
	fn last_host_before_broadcast_is_allocatable() {
		let alloc = allocator("10.0.0.1/8");
		assert_eq!(
			alloc.allocate(0x00ff_fffd).unwrap(),
			Ipv4Addr::new(10, 255, 255, 254)
		);
		assert!(matches!(
			alloc.allocate(0x00ff_fffe),
			Err(EnrollError::AddressSpaceExhausted { .. })
		));
	}

	#[test]
	fn small_subnet_exhausts_at_broadcast() {
		let alloc = allocator("192.168.7.1/30");
		assert_eq!(alloc.allocate(1).unwrap(), Ipv4Addr::new(192, 168, 7, 2));

		let err = alloc.allocate(2).unwrap_err();
		assert_eq!(err.code(), "address_space_exhausted");
		assert!(err.to_string().contains("192.168.7.0/30"));
	}

	#[test]
	fn ordinal_zero_is_the_interface_itself() {
		assert!(allocator("10.0.0.1/24").allocate(0).is_err());
	}

	#[test]
	fn never_wraps_past_the_top_of_ipv4() {
		let alloc = allocator("255.255.255.254/0");
		assert!(alloc.allocate(1).is_err());
		assert!(alloc.allocate(usize::MAX).is_err());
	}

	proptest! {
		#[test]
		fn allocations_are_distinct_hosts_in_subnet(prefix in 16u8..=29, count in 1usize..64) {
			let net = Ipv4Net::new(Ipv4Addr::new(172, 16, 0, 1), prefix).unwrap();
			let alloc = AddressAllocator::new(net);
			let mut previous = u32::from(net.addr());

			for ordinal in 1..=count {
				match alloc.allocate(ordinal) {
					Ok(addr) => {
						prop_assert!(net.contains(&addr));
						prop_assert_ne!(addr, net.broadcast());
						prop_assert_eq!(u32::from(addr), previous + 1);
						previous = u32::from(addr);
					}
					Err(EnrollError::AddressSpaceExhausted { .. }) => {
						prop_assert_eq!(previous + 1, u32::from(net.broadcast()));
						break;
					}
					Err(other) => prop_assert!(false, "unexpected error: {other}"),
				}
			}
		}
	}
}
