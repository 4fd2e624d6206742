//! Three-level architect identity: individual -> composition -> building credit.
//!
//! [`ArchitectIndex`] is an arena of entities plus index maps where each hop is a
//! set lookup. [`ArchitectNameResolver`] runs the same hops against a
//! [`BuildingStore`], one awaited call per hop.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::core::filters::contains_ignore_case;
use crate::models::{
    split_legacy_names, BuildingArchitects, BuildingRow, CompositeRow, CompositionRow, CreditRow,
    IndividualArchitect, Language,
};
use crate::services::store::{BuildingStore, StoreError};

/// Bidirectional partial containment used for legacy delimited names
#[inline]
pub fn legacy_name_matches(selected: &str, segment: &str) -> bool {
    contains_ignore_case(selected, segment) || contains_ignore_case(segment, selected)
}

fn composite_name(composite: &CompositeRow, language: Language) -> &str {
    match language {
        Language::Ja => &composite.name_ja,
        Language::En => composite.name_en.as_deref().unwrap_or(&composite.name_ja),
    }
}

/// A composite with no composition rows whose full-width-space segments match any of `names`
pub fn legacy_composite_matches(composite: &CompositeRow, names: &[String], language: Language) -> bool {
    composite.compositions.is_empty()
        && split_legacy_names(composite_name(composite, language))
            .iter()
            .any(|segment| {
                names
                    .iter()
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .any(|n| legacy_name_matches(n, segment))
            })
}

fn clean_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// In-memory arena of architect entities with per-hop index maps
#[derive(Debug, Clone, Default)]
pub struct ArchitectIndex {
    individuals: HashMap<i64, IndividualArchitect>,
    composites: HashMap<i64, CompositeRow>,
    compositions_by_composite: HashMap<i64, Vec<CompositionRow>>,
    composites_by_individual: HashMap<i64, BTreeSet<i64>>,
    credits_by_building: HashMap<i64, Vec<CreditRow>>,
    buildings_by_composite: HashMap<i64, BTreeSet<i64>>,
}

impl ArchitectIndex {
    /// Build the index from the credit relations embedded in backend rows
    pub fn from_rows(rows: &[BuildingRow]) -> Self {
        let mut index = Self::default();

        for row in rows {
            for credit in &row.building_architects {
                index
                    .buildings_by_composite
                    .entry(credit.architect_id)
                    .or_default()
                    .insert(row.building_id);

                let mut stripped = credit.clone();
                stripped.building_id = row.building_id;

                if let Some(composite) = &credit.architect {
                    for composition in &composite.compositions {
                        index.add_composition(composition);
                    }
                    index.composites.insert(
                        composite.architect_id,
                        CompositeRow {
                            compositions: Vec::new(),
                            ..composite.clone()
                        },
                    );
                    stripped.architect = index.composites.get(&composite.architect_id).cloned();
                }

                index
                    .credits_by_building
                    .entry(row.building_id)
                    .or_default()
                    .push(stripped);
            }
        }

        index
    }

    fn add_composition(&mut self, composition: &CompositionRow) {
        let rows = self
            .compositions_by_composite
            .entry(composition.architect_id)
            .or_default();
        let duplicate = rows.iter().any(|r| {
            r.individual_architect_id == composition.individual_architect_id
                && r.order_index == composition.order_index
        });
        if !duplicate {
            rows.push(CompositionRow {
                individual: None,
                ..composition.clone()
            });
        }

        self.composites_by_individual
            .entry(composition.individual_architect_id)
            .or_default()
            .insert(composition.architect_id);

        if let Some(individual) = &composition.individual {
            self.individuals
                .insert(individual.individual_architect_id, individual.clone());
        }
    }

    pub fn individual_count(&self) -> usize {
        self.individuals.len()
    }

    pub fn find_individuals(&self, names: &[String], language: Language) -> Vec<IndividualArchitect> {
        let names = clean_names(names);
        let mut found: Vec<IndividualArchitect> = self
            .individuals
            .values()
            .filter(|a| names.iter().any(|n| contains_ignore_case(a.name(language), n)))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.individual_architect_id);
        found
    }

    pub fn find_legacy_composites(&self, names: &[String], language: Language) -> Vec<i64> {
        let names = clean_names(names);
        let mut ids: Vec<i64> = self
            .composites
            .values()
            .filter(|c| !self.compositions_by_composite.contains_key(&c.architect_id))
            .filter(|c| legacy_composite_matches(c, &names, language))
            .map(|c| c.architect_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn compositions_for_individuals(&self, individual_ids: &[i64]) -> Vec<CompositionRow> {
        let wanted: HashSet<i64> = individual_ids.iter().copied().collect();
        let composites: BTreeSet<i64> = individual_ids
            .iter()
            .filter_map(|id| self.composites_by_individual.get(id))
            .flatten()
            .copied()
            .collect();

        composites
            .iter()
            .filter_map(|id| self.compositions_by_composite.get(id))
            .flatten()
            .filter(|r| wanted.contains(&r.individual_architect_id))
            .cloned()
            .collect()
    }

    pub fn credits_for_composites(&self, composite_ids: &[i64]) -> Vec<CreditRow> {
        let wanted: HashSet<i64> = composite_ids.iter().copied().collect();
        let buildings: BTreeSet<i64> = composite_ids
            .iter()
            .filter_map(|id| self.buildings_by_composite.get(id))
            .flatten()
            .copied()
            .collect();

        buildings
            .iter()
            .filter_map(|id| self.credits_by_building.get(id))
            .flatten()
            .filter(|c| wanted.contains(&c.architect_id))
            .map(|c| CreditRow {
                architect: None,
                ..c.clone()
            })
            .collect()
    }

    pub fn credits_for_building(&self, building_id: i64) -> Vec<CreditRow> {
        self.credits_by_building
            .get(&building_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn compositions_for_composites(&self, composite_ids: &[i64]) -> Vec<CompositionRow> {
        composite_ids
            .iter()
            .filter_map(|id| self.compositions_by_composite.get(id))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn individuals_by_ids(&self, ids: &[i64]) -> Vec<IndividualArchitect> {
        ids.iter()
            .filter_map(|id| self.individuals.get(id))
            .cloned()
            .collect()
    }

    /// All three forward hops at once
    pub fn buildings_for_names(&self, names: &[String], language: Language) -> BTreeSet<i64> {
        let individual_ids: Vec<i64> = self
            .find_individuals(names, language)
            .iter()
            .map(|a| a.individual_architect_id)
            .collect();

        let mut composite_ids: BTreeSet<i64> = self
            .compositions_for_individuals(&individual_ids)
            .iter()
            .map(|r| r.architect_id)
            .collect();
        composite_ids.extend(self.find_legacy_composites(names, language));

        if composite_ids.is_empty() {
            return BTreeSet::new();
        }

        let composite_ids: Vec<i64> = composite_ids.into_iter().collect();
        self.credits_for_composites(&composite_ids)
            .iter()
            .map(|c| c.building_id)
            .collect()
    }
}

/// Resolves architect names to building identifiers (and back) through the store
#[derive(Clone)]
pub struct ArchitectNameResolver {
    store: Arc<dyn BuildingStore>,
}

impl ArchitectNameResolver {
    pub fn new(store: Arc<dyn BuildingStore>) -> Self {
        Self { store }
    }

    /// Building ids credited to any architect whose name contains one of `names`.
    ///
    /// A hop that returns nothing ends the traversal with an empty set.
    pub async fn resolve_buildings(
        &self,
        names: &[String],
        language: Language,
    ) -> Result<BTreeSet<i64>, StoreError> {
        let names = clean_names(names);
        if names.is_empty() {
            return Ok(BTreeSet::new());
        }

        // Hop 1: individuals by name
        let individuals = self.store.find_individuals(&names, language).await?;
        let individual_ids: Vec<i64> = individuals
            .iter()
            .map(|a| a.individual_architect_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Hop 2: individuals -> composites, plus unmigrated composites matched by stored name
        let mut composite_ids = BTreeSet::new();
        if !individual_ids.is_empty() {
            let rows = self
                .store
                .compositions_for_individuals(&individual_ids)
                .await?;
            composite_ids.extend(rows.iter().map(|r| r.architect_id));
        }
        composite_ids.extend(self.store.find_legacy_composites(&names, language).await?);

        if composite_ids.is_empty() {
            tracing::debug!("No architects match {:?}", names);
            return Ok(BTreeSet::new());
        }

        // Hop 3: composites -> buildings
        let composite_ids: Vec<i64> = composite_ids.into_iter().collect();
        let credits = self.store.credits_for_composites(&composite_ids).await?;
        let buildings: BTreeSet<i64> = credits.iter().map(|c| c.building_id).collect();

        tracing::debug!(
            "Resolved {:?} to {} individuals, {} composites, {} buildings",
            names,
            individual_ids.len(),
            composite_ids.len(),
            buildings.len()
        );

        Ok(buildings)
    }

    /// Architects credited on one building, deduplicated by individual id
    pub async fn architects_for_building(
        &self,
        building_id: i64,
        language: Language,
    ) -> Result<BuildingArchitects, StoreError> {
        let mut result = BuildingArchitects {
            building_id,
            ..BuildingArchitects::default()
        };

        let mut credits = self.store.credits_for_building(building_id).await?;
        if credits.is_empty() {
            return Ok(result);
        }
        credits.sort_by_key(|c| c.architect_order);

        let credit_order: HashMap<i64, i32> = credits
            .iter()
            .rev()
            .map(|c| (c.architect_id, c.architect_order))
            .collect();
        let composite_ids: Vec<i64> = credits
            .iter()
            .map(|c| c.architect_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut compositions = self.store.compositions_for_composites(&composite_ids).await?;
        let composed: HashSet<i64> = compositions.iter().map(|c| c.architect_id).collect();

        let mut seen_names = HashSet::new();
        result.legacy_names = credits
            .iter()
            .filter(|c| !composed.contains(&c.architect_id))
            .filter_map(|c| c.architect.as_ref())
            .flat_map(|a| split_legacy_names(composite_name(a, language)))
            .filter(|name| seen_names.insert(name.clone()))
            .collect();

        if compositions.is_empty() {
            return Ok(result);
        }

        let individual_ids: Vec<i64> = compositions
            .iter()
            .map(|c| c.individual_architect_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let individuals: HashMap<i64, IndividualArchitect> = self
            .store
            .individuals_by_ids(&individual_ids)
            .await?
            .into_iter()
            .map(|a| (a.individual_architect_id, a))
            .collect();

        compositions.sort_by_key(|c| {
            (
                credit_order.get(&c.architect_id).copied().unwrap_or(i32::MAX),
                c.order_index,
            )
        });

        let mut seen = HashSet::new();
        result.individuals = compositions
            .iter()
            .filter(|c| seen.insert(c.individual_architect_id))
            .filter_map(|c| individuals.get(&c.individual_architect_id).cloned())
            .collect();

        Ok(result)
    }
}
