use indexmap::{IndexMap, IndexSet};

/// Groups ids that are electrically connected into nets.
///
/// Net ids are assigned in creation order as `connectivity_net{n}`. Adding a
/// group that touches several existing nets merges them into the oldest one.
#[derive(Clone, Debug, Default)]
pub struct ConnectivityMap {
    nets: IndexMap<String, IndexSet<String>>,
    id_to_net: IndexMap<String, String>,
    next_net: usize,
}

impl ConnectivityMap {
    pub fn new() -> Self {
        ConnectivityMap::default()
    }

    pub fn from_groups<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = ConnectivityMap::new();
        map.add_connections(groups);
        map
    }

    pub fn add_connections<I, G, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for group in groups {
            let ids: Vec<String> = group.into_iter().map(Into::into).collect();
            if ids.is_empty() {
                continue;
            }
            self.add_group(ids);
        }
    }

    fn add_group(&mut self, ids: Vec<String>) {
        let mut touched: IndexSet<String> = IndexSet::new();
        for id in &ids {
            if let Some(net) = self.id_to_net.get(id) {
                touched.insert(net.clone());
            }
        }

        let target = match touched.iter().min_by_key(|net| self.nets.get_index_of(*net)) {
            Some(net) => net.clone(),
            None => {
                let net = format!("connectivity_net{}", self.next_net);
                self.next_net += 1;
                self.nets.insert(net.clone(), IndexSet::new());
                net
            }
        };

        for net in touched.iter().filter(|net| **net != target) {
            if let Some(members) = self.nets.shift_remove(net) {
                for member in members {
                    self.id_to_net.insert(member.clone(), target.clone());
                    if let Some(target_members) = self.nets.get_mut(&target) {
                        target_members.insert(member);
                    }
                }
            }
        }

        for id in ids {
            self.id_to_net.insert(id.clone(), target.clone());
            if let Some(target_members) = self.nets.get_mut(&target) {
                target_members.insert(id);
            }
        }
    }

    pub fn net_connected_to_id(&self, id: &str) -> Option<&str> {
        self.id_to_net.get(id).map(String::as_str)
    }

    pub fn ids_connected_to_net(&self, net: &str) -> impl Iterator<Item = &String> {
        self.nets.get(net).into_iter().flat_map(|members| members.iter())
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        match (self.net_connected_to_id(a), self.net_connected_to_id(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
