//! A generic keyed store mapping a logical resource to its lazily created backend
//! representation. One instance exists per kind of resource.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::backends::{Adapter, MapAdapter, Mappable};
use crate::buffer::MapParams;
use crate::errors::*;
use crate::resource::{Resource, ResourceId};

struct Entry<O> {
    object: O,
    mapped: Option<MapParams>,
}

pub struct ResourceCache<R: Resource, A: Adapter<R>> {
    entries: HashMap<ResourceId, Entry<A::Object>>,
    _phantom: PhantomData<fn(&R)>,
}

impl<R: Resource, A: Adapter<R>> Default for ResourceCache<R, A> {
    fn default() -> Self {
        ResourceCache {
            entries: HashMap::new(),
            _phantom: PhantomData,
        }
    }
}

impl<R: Resource, A: Adapter<R>> ResourceCache<R, A> {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.contains_key(&id)
    }

    /// The backend representation of a bound resource.
    pub fn object(&self, id: ResourceId) -> Option<&A::Object> {
        self.entries.get(&id).map(|v| &v.object)
    }

    /// Creates the backend representation of `resource` if there is none. Returns whether
    /// it has been created by this call.
    pub fn bind(&mut self, adapter: &mut A, resource: &R) -> Result<bool> {
        self.entry(adapter, resource).map(|(_, created)| created)
    }

    fn entry(&mut self, adapter: &mut A, resource: &R) -> Result<(&mut Entry<A::Object>, bool)> {
        use std::collections::hash_map::Entry as MapEntry;

        match self.entries.entry(resource.id()) {
            MapEntry::Occupied(v) => Ok((v.into_mut(), false)),
            MapEntry::Vacant(v) => {
                let object = adapter.create(resource)?;
                debug!("Creates {:?} {}.", R::KIND, resource.id());
                Ok((
                    v.insert(Entry {
                        object,
                        mapped: None,
                    }),
                    true,
                ))
            }
        }
    }

    /// Destroys the backend representation of `id`. Returns whether there was one.
    pub fn unbind(&mut self, adapter: &mut A, id: ResourceId) -> Result<bool> {
        match self.entries.remove(&id) {
            Some(entry) => {
                if entry.mapped.is_some() {
                    warn!("Destroys {:?} {} while it is still mapped.", R::KIND, id);
                }

                debug!("Destroys {:?} {}.", R::KIND, id);
                adapter.destroy(entry.object)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Activates `resource` at `binding`, creating its backend representation on demand.
    pub fn enable(&mut self, adapter: &mut A, resource: &R, binding: R::Binding) -> Result<()> {
        let (entry, _) = self.entry(adapter, resource)?;
        trace!("Enables {:?} {} at {:?}.", R::KIND, resource.id(), binding);
        adapter.enable(&mut entry.object, resource, binding)
    }

    /// Deactivates `resource` at `binding`, creating its backend representation on demand.
    pub fn disable(&mut self, adapter: &mut A, resource: &R, binding: R::Binding) -> Result<()> {
        let (entry, _) = self.entry(adapter, resource)?;
        trace!("Disables {:?} {} at {:?}.", R::KIND, resource.id(), binding);
        adapter.disable(&mut entry.object, binding)
    }

    /// Deactivates the resource known by `id`. Nothing happens if it has no backend
    /// representation anymore.
    pub fn disable_id(&mut self, adapter: &mut A, id: ResourceId, binding: R::Binding) -> Result<()> {
        if let Some(entry) = self.entries.get_mut(&id) {
            trace!("Disables {:?} {} at {:?}.", R::KIND, id, binding);
            adapter.disable(&mut entry.object, binding)?;
        }

        Ok(())
    }

    /// Destroys every backend representation. Failures are logged and counted, the
    /// remaining entries are destroyed regardless.
    pub fn clear(&mut self, adapter: &mut A) -> usize {
        let mut failures = 0;
        for (id, entry) in self.entries.drain() {
            if let Err(err) = adapter.destroy(entry.object) {
                warn!("Failed to destroy {:?} {}: {}", R::KIND, id, err);
                failures += 1;
            }
        }

        failures
    }
}

impl<R: Mappable, A: MapAdapter<R>> ResourceCache<R, A> {
    /// Maps a range of the storage of `resource`, creating its backend representation on
    /// demand.
    pub fn map<'a>(
        &'a mut self,
        adapter: &'a mut A,
        resource: &R,
        params: MapParams,
    ) -> Result<&'a mut [u8]> {
        Error::check_range(params.offset, params.size, resource.capacity_bytes())?;

        let (entry, _) = self.entry(adapter, resource)?;
        if entry.mapped.is_some() {
            return Err(Error::AlreadyMapped(R::KIND, resource.id()));
        }

        trace!("Maps {:?} {} with {:?}.", R::KIND, resource.id(), params);
        let bytes = adapter.map(&mut entry.object, params)?;
        entry.mapped = Some(params);
        Ok(bytes)
    }

    /// Publishes `[offset, offset + size)` of the mapped range of `resource`.
    pub fn flush(&mut self, adapter: &mut A, resource: &R, offset: usize, size: usize) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&resource.id())
            .ok_or_else(|| Error::NotMapped(R::KIND, resource.id()))?;

        let params = entry
            .mapped
            .ok_or_else(|| Error::NotMapped(R::KIND, resource.id()))?;

        if size == 0 {
            if offset > params.size {
                return Err(Error::Range {
                    offset,
                    end: offset,
                    capacity: params.size,
                });
            }

            trace!("Skips flushing {:?} {}, the range is empty.", R::KIND, resource.id());
            return Ok(());
        }

        Error::check_range(offset, size, resource.capacity_bytes())?;
        Error::check_range(offset, size, params.size)?;

        if !params.requires_flush() {
            trace!("Skips flushing {:?} {}, it is flushed on unmap.", R::KIND, resource.id());
            return Ok(());
        }

        adapter.flush(&mut entry.object, offset, size)
    }

    pub fn unmap(&mut self, adapter: &mut A, resource: &R) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&resource.id())
            .ok_or_else(|| Error::NotMapped(R::KIND, resource.id()))?;

        if entry.mapped.take().is_none() {
            return Err(Error::NotMapped(R::KIND, resource.id()));
        }

        trace!("Unmaps {:?} {}.", R::KIND, resource.id());
        adapter.unmap(&mut entry.object)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backends::headless::{Command, HeadlessDevice};
    use crate::buffer::*;

    type VertexBufferCache = ResourceCache<VertexBuffer, HeadlessDevice>;

    fn buffer() -> VertexBuffer {
        VertexBuffer::new(16, 4, BufferUsage::Dynamic, StorageMode::Host).unwrap()
    }

    fn params(offset: usize, size: usize) -> MapParams {
        MapParams {
            access: AccessMode::Write,
            flush: FlushMode::Explicit,
            sync: SyncMode::Unsynchronized,
            offset,
            size,
        }
    }

    #[test]
    fn idempotent_bind() {
        let mut device = HeadlessDevice::new();
        let mut cache = VertexBufferCache::new();
        let vb = buffer();

        assert!(cache.bind(&mut device, &vb).unwrap());
        assert!(!cache.bind(&mut device, &vb).unwrap());
        assert_eq!(cache.len(), 1);

        let creates = device
            .commands()
            .iter()
            .filter(|v| match v {
                Command::Create { .. } => true,
                _ => false,
            })
            .count();

        assert_eq!(creates, 1);
    }

    #[test]
    fn unbind() {
        let mut device = HeadlessDevice::new();
        let mut cache = VertexBufferCache::new();
        let vb = buffer();

        assert!(!cache.unbind(&mut device, vb.id()).unwrap());
        cache.bind(&mut device, &vb).unwrap();
        assert!(cache.unbind(&mut device, vb.id()).unwrap());
        assert!(cache.is_empty());
        assert_eq!(device.alive(), 0);
    }

    #[test]
    fn enable_on_demand() {
        let mut device = HeadlessDevice::new();
        let mut cache = VertexBufferCache::new();
        let vb = buffer();

        let binding = VertexBinding {
            index: 0,
            offset: 0,
            stride: 4,
        };

        cache.enable(&mut device, &vb, binding).unwrap();
        assert!(cache.contains(vb.id()));
        cache.disable_id(&mut device, vb.id(), binding).unwrap();

        let commands = device.take_commands();
        assert_eq!(commands.len(), 3);

        cache.unbind(&mut device, vb.id()).unwrap();
        device.take_commands();
        cache.disable_id(&mut device, vb.id(), binding).unwrap();
        assert!(device.commands().is_empty());
    }

    #[test]
    fn map_contract() {
        let mut device = HeadlessDevice::new();
        let mut cache = VertexBufferCache::new();
        let vb = buffer();

        match cache.flush(&mut device, &vb, 0, 4) {
            Err(Error::NotMapped(_, id)) => assert_eq!(id, vb.id()),
            other => panic!("unexpected {:?}", other),
        }

        assert!(cache.unmap(&mut device, &vb).is_err());
        assert!(cache.map(&mut device, &vb, params(60, 8)).is_err());

        cache.map(&mut device, &vb, params(0, 16)).unwrap();
        match cache.map(&mut device, &vb, params(0, 16)) {
            Err(Error::AlreadyMapped(_, _)) => {}
            other => panic!("unexpected {:?}", other),
        }

        match cache.flush(&mut device, &vb, 0, 65) {
            Err(Error::Range { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }

        assert!(cache.flush(&mut device, &vb, 8, 16).is_err());
        cache.flush(&mut device, &vb, 0, 16).unwrap();
        cache.unmap(&mut device, &vb).unwrap();
        assert!(cache.flush(&mut device, &vb, 0, 4).is_err());
    }

    #[test]
    fn empty_flush() {
        let mut device = HeadlessDevice::new();
        let mut cache = VertexBufferCache::new();
        let vb = buffer();

        match cache.flush(&mut device, &vb, 0, 0) {
            Err(Error::NotMapped(_, _)) => {}
            other => panic!("unexpected {:?}", other),
        }

        cache.map(&mut device, &vb, params(0, 16)).unwrap();
        device.take_commands();

        cache.flush(&mut device, &vb, 8, 0).unwrap();
        cache.flush(&mut device, &vb, 16, 0).unwrap();
        match cache.flush(&mut device, &vb, 17, 0) {
            Err(Error::Range { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }

        assert!(device.commands().is_empty());
        cache.unmap(&mut device, &vb).unwrap();
    }

    #[test]
    fn clear() {
        let mut device = HeadlessDevice::new();
        let mut cache = VertexBufferCache::new();
        let buffers: Vec<_> = (0..4).map(|_| buffer()).collect();

        for v in &buffers {
            cache.bind(&mut device, v).unwrap();
        }

        assert_eq!(device.alive(), 4);
        assert_eq!(cache.clear(&mut device), 0);
        assert_eq!(device.alive(), 0);
        assert!(cache.is_empty());
    }
}
