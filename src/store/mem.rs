//! In-memory reference store.
//!
//! Backs the test suite and embedded use. Transactions stage their writes
//! against a copy of the committed state; [`Transaction::save`] publishes the
//! staged state atomically (last committer wins). Relationship links are kept
//! symmetric when the model declares an inverse, the way an ORM join table
//! would behave.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::model::{Model, Relationship};
use crate::store::{Datastore, FetchOpts, Predicate, Record, SortKey, StoreError, Transaction};
use crate::val::Value;

type Attrs = BTreeMap<String, Value>;
type LinkKey = (String, i64, String);

#[derive(Clone, Debug, Default)]
struct MemData {
	objects: BTreeMap<String, BTreeMap<i64, Attrs>>,
	links: BTreeMap<LinkKey, Vec<i64>>,
	next_id: BTreeMap<String, i64>,
}

impl MemData {
	fn link_ids(&self, entity: &str, id: i64, rel: &str) -> Vec<i64> {
		self.links
			.get(&(entity.to_owned(), id, rel.to_owned()))
			.cloned()
			.unwrap_or_default()
	}

	fn take_links(&mut self, entity: &str, id: i64, rel: &str) -> Vec<i64> {
		self.links.remove(&(entity.to_owned(), id, rel.to_owned())).unwrap_or_default()
	}

	fn insert_link(&mut self, entity: &str, id: i64, rel: &str, target: i64) {
		let ids = self.links.entry((entity.to_owned(), id, rel.to_owned())).or_default();
		if !ids.contains(&target) {
			ids.push(target);
		}
	}

	fn remove_link(&mut self, entity: &str, id: i64, rel: &str, target: i64) {
		let key = (entity.to_owned(), id, rel.to_owned());
		if let Some(ids) = self.links.get_mut(&key) {
			ids.retain(|t| *t != target);
			if ids.is_empty() {
				self.links.remove(&key);
			}
		}
	}
}

pub struct MemStore {
	model: Arc<Model>,
	committed: Arc<Mutex<MemData>>,
}

impl MemStore {
	pub fn new(model: Arc<Model>) -> Self {
		MemStore {
			model,
			committed: Arc::new(Mutex::new(MemData::default())),
		}
	}
}

#[async_trait]
impl Datastore for MemStore {
	async fn transaction(&self) -> Result<Arc<dyn Transaction>, StoreError> {
		let staged = self.committed.lock().expect("store poisoned").clone();
		Ok(Arc::new(MemTransaction {
			model: self.model.clone(),
			committed: self.committed.clone(),
			staged: Mutex::new(staged),
		}))
	}
}

pub struct MemTransaction {
	model: Arc<Model>,
	committed: Arc<Mutex<MemData>>,
	staged: Mutex<MemData>,
}

impl MemTransaction {
	fn rel_def(&self, entity: &str, rel: &str) -> Result<&Relationship, StoreError> {
		self.model
			.get(entity)
			.ok_or_else(|| StoreError::UnknownEntity(entity.to_owned()))?
			.rel(rel)
			.ok_or_else(|| StoreError::UnknownRelationship {
				entity: entity.to_owned(),
				relationship: rel.to_owned(),
			})
	}

	fn inverse_of(&self, rel: &Relationship) -> Option<&Relationship> {
		let inv = rel.inverse.as_ref()?;
		self.model.get(&rel.destination)?.rel(inv)
	}

	fn drop_inverse(&self, data: &mut MemData, rel: &Relationship, target: i64, id: i64) {
		if let Some(inv) = self.inverse_of(rel) {
			data.remove_link(&rel.destination, target, &inv.name, id);
		}
	}

	fn link(&self, data: &mut MemData, entity: &str, rel: &Relationship, id: i64, target: i64) {
		if !rel.to_many {
			for old in data.take_links(entity, id, &rel.name) {
				self.drop_inverse(data, rel, old, id);
			}
		}
		data.insert_link(entity, id, &rel.name, target);
		if let Some(inv) = self.inverse_of(rel) {
			let inv = inv.clone();
			if !inv.to_many {
				// the target's to-one slot is exclusive; displace its holder
				for owner in data.take_links(&rel.destination, target, &inv.name) {
					if owner != id {
						data.remove_link(entity, owner, &rel.name, target);
					}
				}
			}
			data.insert_link(&rel.destination, target, &inv.name, id);
		}
	}

	fn unlink(&self, data: &mut MemData, entity: &str, rel: &Relationship, id: i64, target: i64) {
		data.remove_link(entity, id, &rel.name, target);
		self.drop_inverse(data, rel, target, id);
	}

	fn record(&self, entity: &str, id: i64, values: &Attrs) -> Record {
		Record {
			entity: entity.to_owned(),
			id,
			values: values.clone(),
		}
	}

	fn matches(&self, data: &MemData, entity: &str, id: i64, values: &Attrs, cond: &Predicate) -> bool {
		match cond {
			Predicate::Eq {
				field,
				value,
			} => match values.get(field) {
				Some(v) if !v.is_null() => v.to_raw_string() == *value,
				_ => false,
			},
			Predicate::IdEq(i) => id == *i,
			Predicate::IdIn(ids) => ids.contains(&id),
			Predicate::RelEq {
				rel,
				id: rid,
			} => data.link_ids(entity, id, rel).contains(rid),
			Predicate::RelIn {
				rel,
				ids,
			} => {
				let linked = data.link_ids(entity, id, rel);
				ids.iter().any(|i| linked.contains(i))
			}
			Predicate::Prefix {
				field,
				token,
			} => match values.get(field) {
				Some(Value::String(s)) => s.to_lowercase().starts_with(token),
				_ => false,
			},
			Predicate::WordPrefix {
				field,
				token,
			} => match values.get(field) {
				Some(Value::String(s)) => s.to_lowercase().contains(&format!(" {token}")),
				_ => false,
			},
			Predicate::All(ps) => ps.iter().all(|p| self.matches(data, entity, id, values, p)),
			Predicate::Any(ps) => ps.iter().any(|p| self.matches(data, entity, id, values, p)),
		}
	}

	fn collect(
		&self,
		data: &MemData,
		entity: &str,
		cond: Option<&Predicate>,
	) -> Result<Vec<Record>, StoreError> {
		if self.model.get(entity).is_none() {
			return Err(StoreError::UnknownEntity(entity.to_owned()));
		}
		let Some(objects) = data.objects.get(entity) else {
			return Ok(Vec::new());
		};
		Ok(objects
			.iter()
			.filter(|(id, values)| match cond {
				Some(c) => self.matches(data, entity, **id, values, c),
				None => true,
			})
			.map(|(id, values)| self.record(entity, *id, values))
			.collect())
	}

	fn sort(&self, entity: &str, records: &mut [Record], sort: &[SortKey]) -> Result<(), StoreError> {
		let ent = self
			.model
			.get(entity)
			.ok_or_else(|| StoreError::UnknownEntity(entity.to_owned()))?;
		for key in sort {
			if key.field != "id" && ent.attr(&key.field).is_none() {
				return Err(StoreError::UnknownSortField {
					entity: entity.to_owned(),
					field: key.field.clone(),
				});
			}
		}
		records.sort_by(|a, b| {
			for key in sort {
				let ord = if key.field == "id" {
					a.id.cmp(&b.id)
				} else {
					a.value(&key.field).cmp_sort(&b.value(&key.field))
				};
				let ord = if key.desc {
					ord.reverse()
				} else {
					ord
				};
				if !ord.is_eq() {
					return ord;
				}
			}
			a.id.cmp(&b.id)
		});
		Ok(())
	}
}

#[async_trait]
impl Transaction for MemTransaction {
	async fn get_objects(&self, entity: &str, opts: &FetchOpts) -> Result<Vec<Record>, StoreError> {
		let data = self.staged.lock().expect("store poisoned");
		let mut records = self.collect(&data, entity, opts.cond.as_ref())?;
		drop(data);
		self.sort(entity, &mut records, &opts.sort)?;
		let offset = opts.offset.unwrap_or(0) as usize;
		let records = records.into_iter().skip(offset);
		Ok(match opts.limit {
			Some(limit) => records.take(limit as usize).collect(),
			None => records.collect(),
		})
	}

	async fn get_objects_count(
		&self,
		entity: &str,
		cond: Option<&Predicate>,
	) -> Result<u64, StoreError> {
		let data = self.staged.lock().expect("store poisoned");
		Ok(self.collect(&data, entity, cond)?.len() as u64)
	}

	async fn get_object_with_id(
		&self,
		entity: &str,
		id: i64,
	) -> Result<Option<Record>, StoreError> {
		if self.model.get(entity).is_none() {
			return Err(StoreError::UnknownEntity(entity.to_owned()));
		}
		let data = self.staged.lock().expect("store poisoned");
		Ok(data
			.objects
			.get(entity)
			.and_then(|objects| objects.get(&id))
			.map(|values| self.record(entity, id, values)))
	}

	async fn get_object_with_filter(
		&self,
		entity: &str,
		cond: &Predicate,
	) -> Result<Option<Record>, StoreError> {
		let data = self.staged.lock().expect("store poisoned");
		Ok(self.collect(&data, entity, Some(cond))?.into_iter().next())
	}

	async fn create(&self, entity: &str, values: Attrs) -> Result<Record, StoreError> {
		if self.model.get(entity).is_none() {
			return Err(StoreError::UnknownEntity(entity.to_owned()));
		}
		let mut data = self.staged.lock().expect("store poisoned");
		let id = {
			let next = data.next_id.entry(entity.to_owned()).or_insert(1);
			let id = *next;
			*next += 1;
			id
		};
		data.objects.entry(entity.to_owned()).or_default().insert(id, values.clone());
		Ok(self.record(entity, id, &values))
	}

	async fn set_attributes(
		&self,
		entity: &str,
		id: i64,
		values: Attrs,
	) -> Result<(), StoreError> {
		if self.model.get(entity).is_none() {
			return Err(StoreError::UnknownEntity(entity.to_owned()));
		}
		let mut data = self.staged.lock().expect("store poisoned");
		match data.objects.get_mut(entity).and_then(|objects| objects.get_mut(&id)) {
			Some(object) => {
				object.extend(values);
				Ok(())
			}
			None => Err(StoreError::MissingObject {
				entity: entity.to_owned(),
				id,
			}),
		}
	}

	async fn get_related_one(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
	) -> Result<Option<Record>, StoreError> {
		let def = self.rel_def(entity, rel)?;
		let data = self.staged.lock().expect("store poisoned");
		let target = data.link_ids(entity, id, rel).into_iter().next();
		Ok(target.and_then(|t| {
			data.objects
				.get(&def.destination)
				.and_then(|objects| objects.get(&t))
				.map(|values| self.record(&def.destination, t, values))
		}))
	}

	async fn get_related_many(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
	) -> Result<Vec<Record>, StoreError> {
		let def = self.rel_def(entity, rel)?;
		let data = self.staged.lock().expect("store poisoned");
		Ok(data
			.link_ids(entity, id, rel)
			.into_iter()
			.filter_map(|t| {
				data.objects
					.get(&def.destination)
					.and_then(|objects| objects.get(&t))
					.map(|values| self.record(&def.destination, t, values))
			})
			.collect())
	}

	async fn add_related(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
		targets: &[i64],
	) -> Result<(), StoreError> {
		let def = self.rel_def(entity, rel)?.clone();
		let mut data = self.staged.lock().expect("store poisoned");
		for &target in targets {
			self.link(&mut data, entity, &def, id, target);
		}
		Ok(())
	}

	async fn remove_related(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
		targets: &[i64],
	) -> Result<(), StoreError> {
		let def = self.rel_def(entity, rel)?.clone();
		let mut data = self.staged.lock().expect("store poisoned");
		for &target in targets {
			self.unlink(&mut data, entity, &def, id, target);
		}
		Ok(())
	}

	async fn set_related(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
		target: Option<i64>,
	) -> Result<(), StoreError> {
		let def = self.rel_def(entity, rel)?.clone();
		let mut data = self.staged.lock().expect("store poisoned");
		match target {
			Some(target) => self.link(&mut data, entity, &def, id, target),
			None => {
				for old in data.take_links(entity, id, rel) {
					self.drop_inverse(&mut data, &def, old, id);
				}
			}
		}
		Ok(())
	}

	async fn delete_object(&self, entity: &str, id: i64) -> Result<(), StoreError> {
		let ent = self
			.model
			.get(entity)
			.ok_or_else(|| StoreError::UnknownEntity(entity.to_owned()))?;
		let mut data = self.staged.lock().expect("store poisoned");
		for rel in &ent.relationships {
			for target in data.take_links(entity, id, &rel.name) {
				self.drop_inverse(&mut data, rel, target, id);
			}
		}
		// incoming links from every relationship targeting this entity
		for other in self.model.entities.values() {
			for rel in other.relationships.iter().filter(|r| r.destination == entity) {
				let owners: Vec<i64> = data
					.links
					.iter()
					.filter(|((e, _, r), targets)| {
						e == &other.name && r == &rel.name && targets.contains(&id)
					})
					.map(|((_, owner, _), _)| *owner)
					.collect();
				for owner in owners {
					data.remove_link(&other.name, owner, &rel.name, id);
				}
			}
		}
		if let Some(objects) = data.objects.get_mut(entity) {
			objects.remove(&id);
		}
		Ok(())
	}

	async fn save(&self) -> Result<(), StoreError> {
		let staged = self.staged.lock().expect("store poisoned").clone();
		*self.committed.lock().expect("store poisoned") = staged;
		Ok(())
	}
}
