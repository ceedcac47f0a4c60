use crate::Variable;

/// Groups of variable positions whose summed multiplicity must be even for a
/// term to survive. Each group is one symmetry operation under which its
/// variables are odd.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Checks(pub Vec<Vec<usize>>);

impl Checks {
    /// the inversion check: one group holding every variable flagged
    /// centrosymmetric. empty if there are none
    pub fn centrosymmetric(variables: &[Variable]) -> Self {
        let group: Vec<_> = variables
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.centrosymmetric.then_some(i))
            .collect();
        if group.is_empty() {
            Self::default()
        } else {
            Self(vec![group])
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// true if the multiplicities in `row` sum to an even number over every
    /// group
    pub fn mod_check(&self, row: &[u8]) -> bool {
        for check in &self.0 {
            if check.iter().map(|&i| row[i] as usize).sum::<usize>() % 2 != 0 {
                return false;
            }
        }
        true
    }
}
