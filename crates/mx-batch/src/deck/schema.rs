//! Batch deck schema definitions.

use crate::context::EosContext;
use mx_core::Real;
use mx_eos::{DavisProductsParams, DavisReactantsParams, GruneisenParams, JwlParams};
use mx_pte::{InputMode, MixResult, PteConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchDeck {
    pub name: String,
    pub mode: InputMode,
    #[serde(default)]
    pub solver: PteConfig,
    /// Also compute per-material bmod, dpde and cv
    #[serde(default)]
    pub material_outputs: bool,
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    #[serde(default)]
    pub cells: Vec<CellDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialDef {
    pub name: String,
    pub model: ModelDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ModelDef {
    IdealGas {
        gm1: f64,
        cv: f64,
    },
    Jwl {
        a: f64,
        b: f64,
        r1: f64,
        r2: f64,
        w: f64,
        rho0: f64,
        cv: f64,
    },
    Gruneisen {
        c0: f64,
        s1: f64,
        #[serde(default)]
        s2: f64,
        #[serde(default)]
        s3: f64,
        g0: f64,
        #[serde(default)]
        b: f64,
        rho0: f64,
        t0: f64,
        #[serde(default)]
        p0: f64,
        cv: f64,
    },
    DavisProducts {
        a: f64,
        b: f64,
        k: f64,
        n: f64,
        vc: f64,
        pc: f64,
        cv: f64,
        #[serde(default)]
        e0: f64,
    },
    DavisReactants {
        rho0: f64,
        #[serde(default)]
        e0: f64,
        #[serde(default)]
        p0: f64,
        t0: f64,
        a: f64,
        b: f64,
        c: f64,
        g0: f64,
        #[serde(default)]
        z: f64,
        #[serde(default)]
        alpha: f64,
        cv0: f64,
    },
}

impl ModelDef {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelDef::IdealGas { .. } => "IdealGas",
            ModelDef::Jwl { .. } => "Jwl",
            ModelDef::Gruneisen { .. } => "Gruneisen",
            ModelDef::DavisProducts { .. } => "DavisProducts",
            ModelDef::DavisReactants { .. } => "DavisReactants",
        }
    }

    /// Register this model in `ctx` under `index`.
    pub fn register(&self, ctx: &mut EosContext, index: usize) -> MixResult<()> {
        match *self {
            ModelDef::IdealGas { gm1, cv } => ctx.register_ideal_gas(index, gm1, cv),
            ModelDef::Jwl {
                a,
                b,
                r1,
                r2,
                w,
                rho0,
                cv,
            } => ctx.register_jwl(
                index,
                JwlParams {
                    a,
                    b,
                    r1,
                    r2,
                    w,
                    rho0,
                    cv,
                },
            ),
            ModelDef::Gruneisen {
                c0,
                s1,
                s2,
                s3,
                g0,
                b,
                rho0,
                t0,
                p0,
                cv,
            } => ctx.register_gruneisen(
                index,
                GruneisenParams {
                    c0,
                    s1,
                    s2,
                    s3,
                    g0,
                    b,
                    rho0,
                    t0,
                    p0,
                    cv,
                },
            ),
            ModelDef::DavisProducts {
                a,
                b,
                k,
                n,
                vc,
                pc,
                cv,
                e0,
            } => ctx.register_davis_products(
                index,
                DavisProductsParams {
                    a,
                    b,
                    k,
                    n,
                    vc,
                    pc,
                    cv,
                    e0,
                },
            ),
            ModelDef::DavisReactants {
                rho0,
                e0,
                p0,
                t0,
                a,
                b,
                c,
                g0,
                z,
                alpha,
                cv0,
            } => ctx.register_davis_reactants(
                index,
                DavisReactantsParams {
                    rho0,
                    e0,
                    p0,
                    t0,
                    a,
                    b,
                    c,
                    g0,
                    z,
                    alpha,
                    cv0,
                },
            ),
        }
    }
}

/// One cell. Only the fields the deck's mode takes as input are required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spvol: Option<Real>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sie: Option<Real>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press: Option<Real>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<Real>,
    #[serde(default = "unit_volume")]
    pub vol: Real,
    #[serde(default)]
    pub materials: Vec<FractionDef>,
}

fn unit_volume() -> Real {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FractionDef {
    /// Name of a deck material
    pub material: String,
    pub mass: Real,
    /// Volume fraction guess (presence flag in P-T mode)
    pub volume: Real,
    /// Specific internal energy guess
    #[serde(default)]
    pub sie: Real,
}
