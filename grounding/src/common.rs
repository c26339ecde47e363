pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use approx::{abs_diff_eq, assert_abs_diff_eq};
pub use bbox::{prelude::*, CyCxHW, Transform, HW, TLBR};
pub use derivative::Derivative;
pub use itertools::{izip, Itertools as _};
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    array,
    borrow::{Borrow, Cow},
    collections::HashMap,
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
pub use tch::{
    kind::{FLOAT_CPU, INT64_CPU},
    nn::{self, ModuleT as _},
    vision, Device, IndexOp, Kind, Tensor,
};
