//! Topology specification builder.
//!
//! This file turns an abstract topology request (kind + size) into a
//! concrete switch/host/link specification. The generators are closed
//! form: no I/O, no search, fully determined by the adjacency and clamp
//! rules for each kind.

use log::debug;

use super::types::{HostSpec, LinkSpec, SwitchSpec, TopologyKind, TopologySpec};

/// Hard cap on binary tree depth. A requested tree size is treated as a
/// depth and clamped here to bound switch count at 2^depth - 1.
pub const TREE_DEPTH_CAP: u32 = 3;

/// Hard cap on mesh switch count, bounding trunk links at n*(n-1)/2.
pub const MESH_SWITCH_CAP: u32 = 6;

/// Inclusive size bounds for topology requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: u32,
    pub max: u32,
}

/// Errors raised while validating a topology request
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("invalid topology kind '{0}' (expected one of: star, linear, tree, mesh)")]
    InvalidKind(String),

    #[error("size {size} out of range (must be between {min} and {max})")]
    InvalidSize { size: u32, min: u32, max: u32 },
}

/// Build a topology specification for the given kind and size.
///
/// Fails with [`SpecError::InvalidSize`] when `size` falls outside
/// `bounds`. Kind validation happens when parsing the request string
/// into a [`TopologyKind`]. No side effects.
pub fn build(kind: TopologyKind, size: u32, bounds: &SizeBounds) -> Result<TopologySpec, SpecError> {
    if size < bounds.min || size > bounds.max {
        return Err(SpecError::InvalidSize {
            size,
            min: bounds.min,
            max: bounds.max,
        });
    }

    let spec = match kind {
        TopologyKind::Star => build_star(size),
        TopologyKind::Linear => build_linear(size),
        TopologyKind::Tree => build_tree(size),
        TopologyKind::Mesh => build_mesh(size),
    };

    debug!(
        "Built {} spec: {} switches, {} hosts, {} links",
        kind,
        spec.switches.len(),
        spec.hosts.len(),
        spec.links.len()
    );

    Ok(spec)
}

fn switch_id(n: u32) -> SwitchSpec {
    SwitchSpec { id: format!("s{}", n) }
}

fn host_spec(n: u32) -> HostSpec {
    HostSpec {
        id: format!("h{}", n),
        ip: format!("10.0.0.{}", n),
    }
}

/// Star: one central switch, `size` hosts each linked directly to it
fn build_star(num_hosts: u32) -> TopologySpec {
    let switches = vec![switch_id(1)];
    let mut hosts = Vec::new();
    let mut links = Vec::new();

    for i in 1..=num_hosts {
        let h = host_spec(i);
        links.push(LinkSpec::new(h.id.clone(), "s1"));
        hosts.push(h);
    }

    TopologySpec {
        kind: TopologyKind::Star,
        size: num_hosts,
        switches,
        hosts,
        links,
    }
}

/// Linear: `size` switches in a chain, one host attached to each switch
fn build_linear(num_switches: u32) -> TopologySpec {
    let mut switches = Vec::new();
    let mut hosts = Vec::new();
    let mut links = Vec::new();

    for i in 1..=num_switches {
        let s = switch_id(i);
        let h = host_spec(i);
        links.push(LinkSpec::new(h.id.clone(), s.id.clone()));
        // Chain link to the previous switch
        if i > 1 {
            links.push(LinkSpec::new(format!("s{}", i - 1), s.id.clone()));
        }
        switches.push(s);
        hosts.push(h);
    }

    TopologySpec {
        kind: TopologyKind::Linear,
        size: num_switches,
        switches,
        hosts,
        links,
    }
}

/// Binary tree: requested size reinterpreted as depth and clamped to
/// [`TREE_DEPTH_CAP`]; root at level 0, every non-leaf switch has two
/// children, hosts attached only to leaf-level switches.
fn build_tree(depth: u32) -> TopologySpec {
    let effective_depth = depth.min(TREE_DEPTH_CAP);

    let mut switches = vec![switch_id(1)];
    let mut links = Vec::new();
    let mut switch_count = 1u32;

    for level in 1..effective_depth {
        let parent_start = switches.len() - (1 << (level - 1));
        let parent_end = switches.len();

        for parent_idx in parent_start..parent_end {
            let parent_id = switches[parent_idx].id.clone();
            for _child in 0..2 {
                switch_count += 1;
                let s = switch_id(switch_count);
                links.push(LinkSpec::new(parent_id.clone(), s.id.clone()));
                switches.push(s);
            }
        }
    }

    // Hosts go on the last level of switches
    let leaf_count = 1usize << (effective_depth.saturating_sub(1));
    let leaf_start = switches.len().saturating_sub(leaf_count);

    let mut hosts = Vec::new();
    for (n, leaf) in switches[leaf_start..].iter().enumerate() {
        let h = host_spec(n as u32 + 1);
        links.push(LinkSpec::new(h.id.clone(), leaf.id.clone()));
        hosts.push(h);
    }

    // Degenerate depth: never leave the tree hostless
    if hosts.is_empty() {
        let h = host_spec(1);
        links.push(LinkSpec::new(h.id.clone(), "s1"));
        hosts.push(h);
    }

    TopologySpec {
        kind: TopologyKind::Tree,
        size: depth,
        switches,
        hosts,
        links,
    }
}

/// Full mesh: switch count clamped to [`MESH_SWITCH_CAP`], every switch
/// pair linked exactly once, one host per switch.
fn build_mesh(requested: u32) -> TopologySpec {
    let num_switches = requested.min(MESH_SWITCH_CAP);

    let mut switches = Vec::new();
    for i in 1..=num_switches {
        switches.push(switch_id(i));
    }

    // Trunk links: every pair once, smaller index first
    let mut links = Vec::new();
    for i in 0..switches.len() {
        for j in (i + 1)..switches.len() {
            links.push(LinkSpec::new(switches[i].id.clone(), switches[j].id.clone()));
        }
    }

    let mut hosts = Vec::new();
    for i in 1..=num_switches {
        let h = host_spec(i);
        links.push(LinkSpec::new(h.id.clone(), format!("s{}", i)));
        hosts.push(h);
    }

    TopologySpec {
        kind: TopologyKind::Mesh,
        size: requested,
        switches,
        hosts,
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: SizeBounds = SizeBounds { min: 2, max: 20 };

    fn counts(spec: &TopologySpec) -> (usize, usize, usize) {
        (spec.switches.len(), spec.hosts.len(), spec.links.len())
    }

    #[test]
    fn test_star_counts() {
        let spec = build(TopologyKind::Star, 4, &BOUNDS).unwrap();
        assert_eq!(counts(&spec), (1, 4, 4));
        assert_eq!(spec.switches[0].id, "s1");
        assert_eq!(spec.hosts[0].ip, "10.0.0.1");
        // Every link has the central switch as one endpoint
        assert!(spec.links.iter().all(|l| l.a == "s1" || l.b == "s1"));
    }

    #[test]
    fn test_linear_counts() {
        let spec = build(TopologyKind::Linear, 3, &BOUNDS).unwrap();
        assert_eq!(counts(&spec), (3, 3, 5));
        // Chain links s1-s2 and s2-s3 present
        assert!(spec.links.contains(&LinkSpec::new("s1", "s2")));
        assert!(spec.links.contains(&LinkSpec::new("s2", "s3")));
    }

    #[test]
    fn test_tree_depth_two() {
        let spec = build(TopologyKind::Tree, 2, &BOUNDS).unwrap();
        // Root plus two children, hosts only on the two leaves
        assert_eq!(counts(&spec), (3, 2, 4));
        assert!(spec.links.contains(&LinkSpec::new("h1", "s2")));
        assert!(spec.links.contains(&LinkSpec::new("h2", "s3")));
    }

    #[test]
    fn test_tree_depth_three() {
        let spec = build(TopologyKind::Tree, 3, &BOUNDS).unwrap();
        assert_eq!(counts(&spec), (7, 4, 10));
    }

    #[test]
    fn test_tree_depth_clamped() {
        // Depth beyond the cap produces the same topology as the cap
        let clamped = build(TopologyKind::Tree, 5, &BOUNDS).unwrap();
        let capped = build(TopologyKind::Tree, 3, &BOUNDS).unwrap();
        assert_eq!(clamped.switches, capped.switches);
        assert_eq!(clamped.hosts, capped.hosts);
        assert_eq!(clamped.links, capped.links);
        // The requested size is preserved for reporting
        assert_eq!(clamped.size, 5);
    }

    #[test]
    fn test_mesh_counts() {
        let spec = build(TopologyKind::Mesh, 4, &BOUNDS).unwrap();
        // 4 switches, 4 hosts, 6 trunk links + 4 host links
        assert_eq!(counts(&spec), (4, 4, 10));
    }

    #[test]
    fn test_mesh_clamped_to_cap() {
        let spec = build(TopologyKind::Mesh, 10, &BOUNDS).unwrap();
        // Clamped to 6 switches: 6*5/2 = 15 trunk links, 6 host links
        assert_eq!(counts(&spec), (6, 6, 21));
        let trunk = spec
            .links
            .iter()
            .filter(|l| l.a.starts_with('s') && l.b.starts_with('s'))
            .count();
        assert_eq!(trunk, 15);
    }

    #[test]
    fn test_mesh_no_duplicate_trunk_links() {
        let spec = build(TopologyKind::Mesh, 6, &BOUNDS).unwrap();
        let mut seen = std::collections::HashSet::new();
        for link in spec.links.iter().filter(|l| l.a.starts_with('s') && l.b.starts_with('s')) {
            let mut pair = [link.a.clone(), link.b.clone()];
            pair.sort();
            assert!(seen.insert(pair), "duplicate trunk link {:?}", link);
        }
    }

    #[test]
    fn test_size_bounds() {
        // Boundary values: min-1, min, max, max+1
        assert!(build(TopologyKind::Star, 1, &BOUNDS).is_err());
        assert!(build(TopologyKind::Star, 2, &BOUNDS).is_ok());
        assert!(build(TopologyKind::Star, 20, &BOUNDS).is_ok());
        let err = build(TopologyKind::Star, 21, &BOUNDS).unwrap_err();
        assert!(matches!(err, SpecError::InvalidSize { size: 21, .. }));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build(TopologyKind::Mesh, 5, &BOUNDS).unwrap();
        let b = build(TopologyKind::Mesh, 5, &BOUNDS).unwrap();
        assert_eq!(a, b);
    }
}
