//! Sensor registry.
//!
//! Maps the sensor ids from the calibration record to live driver
//! instances, so the sampler can look sensors up by the name the
//! operator configured instead of hard-wiring slots.

use heapless::{String, Vec};
use loopbridge_core::config::SENSOR_ID_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    Full,
    DuplicateName,
    NameTooLong,
}

pub struct SensorRegistry<S, const N: usize> {
    entries: Vec<(String<SENSOR_ID_LEN>, S), N>,
}

impl<S, const N: usize> SensorRegistry<S, N> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &str, sensor: S) -> Result<(), RegistryError> {
        if self.get(name).is_some() {
            return Err(RegistryError::DuplicateName);
        }
        let mut key = String::new();
        key.push_str(name).map_err(|_| RegistryError::NameTooLong)?;
        self.entries
            .push((key, sensor))
            .map_err(|_| RegistryError::Full)
    }

    pub fn get(&self, name: &str) -> Option<&S> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, sensor)| sensor)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut S> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, sensor)| sensor)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut S)> {
        self.entries
            .iter_mut()
            .map(|(key, sensor)| (key.as_str(), sensor))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S, const N: usize> Default for SensorRegistry<S, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_configured_name() {
        let mut registry: SensorRegistry<u32, 2> = SensorRegistry::new();
        registry.register("ch4", 1).unwrap();
        registry.register("range", 2).unwrap();

        assert_eq!(registry.get("ch4"), Some(&1));
        assert_eq!(registry.get("range"), Some(&2));
        assert_eq!(registry.get("co2"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_and_overflow_are_rejected() {
        let mut registry: SensorRegistry<u32, 1> = SensorRegistry::new();
        registry.register("ch4", 1).unwrap();
        assert_eq!(
            registry.register("ch4", 2),
            Err(RegistryError::DuplicateName)
        );
        assert_eq!(registry.register("co2", 3), Err(RegistryError::Full));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let mut registry: SensorRegistry<u32, 2> = SensorRegistry::new();
        assert_eq!(
            registry.register("a-name-well-past-sixteen-chars", 1),
            Err(RegistryError::NameTooLong)
        );
    }

    #[test]
    fn iter_mut_visits_every_sensor() {
        let mut registry: SensorRegistry<u32, 4> = SensorRegistry::new();
        registry.register("a", 1).unwrap();
        registry.register("b", 2).unwrap();
        for (_, sensor) in registry.iter_mut() {
            *sensor += 10;
        }
        assert_eq!(registry.get("a"), Some(&11));
        assert_eq!(registry.get("b"), Some(&12));
    }
}
