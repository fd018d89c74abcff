//! Pyrometric cone equivalents.
//!
//! A cone rating depends on both the peak temperature and how fast the ware
//! got there, so two tables exist: one for slow firings and one for fast
//! ones. Thresholds are in degrees Celsius.

/// Rates (per hour) at or above this magnitude use the fast table.
pub const SLOW_RATE_LIMIT: f64 = 100.0;

/// Temperatures this close below a threshold count as reaching that cone.
const BAND_WIDTH: f64 = 5.0;

#[derive(Debug)]
pub struct ConeTable {
    pub name: &'static str,
    entries: &'static [(f64, &'static str)],
}

pub static SLOW: ConeTable = ConeTable {
    name: "slow",
    entries: &[
        (0.0, ""),
        (540.0, "Quartz"),
        (570.0, ""),
        (586.0, "022"),
        (600.0, "021"),
        (626.0, "020"),
        (678.0, "019"),
        (715.0, "018"),
        (738.0, "017"),
        (772.0, "016"),
        (791.0, "015"),
        (807.0, "014"),
        (837.0, "013"),
        (861.0, "012"),
        (875.0, "011"),
        (903.0, "010"),
        (920.0, "09"),
        (942.0, "08"),
        (976.0, "07"),
        (998.0, "06"),
        (1015.0, "05.5"),
        (1031.0, "05"),
        (1063.0, "04"),
        (1086.0, "03"),
        (1102.0, "02"),
        (1119.0, "01"),
        (1137.0, "1"),
        (1142.0, "2"),
        (1152.0, "3"),
        (1162.0, "4"),
        (1186.0, "5"),
        (1203.0, "5.5"),
        (1222.0, "6"),
        (1239.0, "7"),
        (1249.0, "8"),
        (1260.0, "9"),
        (1285.0, "10"),
        (1293.0, "11"),
        (1304.0, "12"),
    ],
};

pub static FAST: ConeTable = ConeTable {
    name: "fast",
    entries: &[
        (0.0, ""),
        (540.0, "Quartz"),
        (570.0, ""),
        (590.0, "022"),
        (617.0, "021"),
        (638.0, "020"),
        (695.0, "019"),
        (734.0, "018"),
        (763.0, "017"),
        (796.0, "016"),
        (818.0, "015"),
        (838.0, "014"),
        (861.0, "013"),
        (882.0, "012"),
        (894.0, "011"),
        (915.0, "010"),
        (930.0, "09"),
        (956.0, "08"),
        (987.0, "07"),
        (1013.0, "06"),
        (1025.0, "05.5"),
        (1044.0, "05"),
        (1077.0, "04"),
        (1104.0, "03"),
        (1122.0, "02"),
        (1138.0, "01"),
        (1154.0, "1"),
        (1164.0, "2"),
        (1170.0, "3"),
        (1183.0, "4"),
        (1207.0, "5"),
        (1225.0, "5.5"),
        (1243.0, "6"),
        (1257.0, "7"),
        (1271.0, "8"),
        (1280.0, "9"),
        (1305.0, "10"),
        (1312.0, "11"),
        (1324.0, "12"),
    ],
};

/// Where a temperature landed in a cone table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConeMatch {
    /// Within the band just below (or on) the threshold at this index.
    Exact(usize),
    /// Past the threshold at this index but short of the next band.
    Past(usize),
    /// Below the lowest threshold.
    Below,
}

impl ConeMatch {
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Exact(index) | Self::Past(index) => Some(index),
            Self::Below => None,
        }
    }
}

impl ConeTable {
    pub fn for_rate(rate: f64) -> &'static ConeTable {
        if rate.abs() < SLOW_RATE_LIMIT {
            &SLOW
        } else {
            &FAST
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn threshold(&self, index: usize) -> Option<f64> {
        self.entries.get(index).map(|(threshold, _)| *threshold)
    }

    pub fn lookup(&self, temperature: f64) -> ConeMatch {
        let mut last_passed = None;
        for (index, (threshold, _)) in self.entries.iter().enumerate() {
            if temperature >= threshold - BAND_WIDTH && temperature <= *threshold {
                return ConeMatch::Exact(index);
            } else if *threshold <= temperature {
                last_passed = Some(index);
            }
        }
        last_passed.map_or(ConeMatch::Below, ConeMatch::Past)
    }

    pub fn label(&self, found: ConeMatch) -> String {
        match found {
            ConeMatch::Exact(index) => self.entries[index].1.to_string(),
            ConeMatch::Past(index) => {
                let label = self.entries[index].1;
                if label.is_empty() {
                    String::new()
                } else {
                    format!("{label}+")
                }
            }
            ConeMatch::Below => String::new(),
        }
    }
}

/// Cone equivalent of reaching `temperature` (°C) at `rate` (°C per hour).
///
/// A trailing `+` means past that cone but not yet at the next one.
pub fn classify(temperature: f64, rate: f64) -> String {
    let table = ConeTable::for_rate(rate);
    table.label(table.lookup(temperature))
}

#[cfg(test)]
#[path = "tests/cone_tests.rs"]
mod tests;
