// src/physics.rs
// ==============================================================================
// PHYSICS WORLD — rapier3d pipeline + the VehicleWorld seam for the controller
// ------------------------------------------------------------------------------
// Owns every rapier set. Vehicles do NOT live here: the controller only sees
// this through VehicleWorld (ray cast, chassis read, impulse denominator,
// impulse at point). step() is called once per tick by the simulation, after
// every controller has queued its impulses.
// ==============================================================================

use log::{debug, info, warn};
use rapier3d::prelude::*;

use crate::config::{ChassisSpec, ObstacleSpec, WorldConfig};
use crate::vehicle::{ChassisState, RayHit, VehicleWorld};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Bodies further than this from the origin are considered exploded.
const MAX_COORDINATE: Real = 1_000.0;

pub struct PhysicsWorld {
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet, // for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection
    pub query_pipeline: QueryPipeline, // for suspension raycasting
    pub reset_position: Vector<Real>, // where exploded bodies are put back
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(vector![0.0, -9.81, 0.0])
    }
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            reset_position: vector![0.0, 1.0, 0.0],
        }
    }

    /// Builds the static scene described by `config`: ground slab + obstacles.
    pub fn from_config(config: &WorldConfig) -> Self {
        let [gx, gy, gz] = config.gravity;
        let mut world = Self::new(vector![gx, gy, gz]);

        world.add_ground(config.ground_half_extents, config.ground_friction);
        for obstacle in &config.obstacles {
            world.add_obstacle(obstacle);
        }

        info!(
            "🌎 World built. Bodies = {}, Colliders = {}",
            world.bodies.len(),
            world.colliders.len()
        );
        world
    }

    /// Static ground box whose top face sits exactly at y = 0.
    pub fn add_ground(&mut self, half_extents: [Real; 3], friction: Real) -> RigidBodyHandle {
        let [hx, hy, hz] = half_extents;
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -hy, 0.0])
            .build();
        let handle = self.bodies.insert(ground_rb);

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS | GROUP_GROUND))
            .friction(friction)
            .restitution(0.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);

        handle
    }

    pub fn add_obstacle(&mut self, spec: &ObstacleSpec) -> RigidBodyHandle {
        let [px, py, pz] = spec.position;
        let [hx, hy, hz] = spec.half_extents;
        let rotation = vector![0.0, spec.yaw_degrees.to_radians(), 0.0];

        let builder = if spec.dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let handle = self
            .bodies
            .insert(builder.position(Isometry::new(vector![px, py, pz], rotation)).build());

        let mut collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS | GROUP_GROUND))
            .friction(1.0)
            .restitution(0.0);
        if spec.dynamic {
            collider = collider.mass(spec.mass);
        }
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);

        debug!(
            "🧱 Obstacle at {:?} (dynamic = {}, body = {:?})",
            spec.position, spec.dynamic, handle
        );
        handle
    }

    /// Dynamic box chassis. Chassis collide with the scene but not with
    /// each other.
    pub fn spawn_chassis(&mut self, spec: &ChassisSpec, pose: Isometry<Real>) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .position(pose)
            .linear_damping(spec.linear_damping)
            .angular_damping(spec.angular_damping)
            .ccd_enabled(true)
            .build();

        let [hx, hy, hz] = spec.half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .active_events(ActiveEvents::empty())
            .mass(spec.mass)
            .friction(spec.friction)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb); // insert rigid body
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies); // attach to body
        if let Some(body) = self.bodies.get_mut(handle) {
            body.recompute_mass_properties_from_colliders(&self.colliders);
        }
        self.query_pipeline.update(&self.colliders);

        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        let removed = self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
        if removed.is_some() {
            self.query_pipeline.update(&self.colliders);
        }
    }

    /// Advances the simulation by `dt`. Impulses queued by the controllers
    /// since the last step are integrated here.
    pub fn step(&mut self, dt: Real) {
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        self.reset_exploded_bodies();
    }

    /// Safety: bodies with non-finite or runaway positions are put back.
    fn reset_exploded_bodies(&mut self) {
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();

            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > MAX_COORDINATE
                || pos.y.abs() > MAX_COORDINATE
                || pos.z.abs() > MAX_COORDINATE;

            if bad {
                body.set_position(Isometry::translation(
                    self.reset_position.x,
                    self.reset_position.y,
                    self.reset_position.z,
                ), true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);

                warn!("⚠️ Reset exploding body {:?} (was at {:?})", handle, pos);
            }
        }
    }
}

// ==============================================================================
// VehicleWorld
// ==============================================================================
impl VehicleWorld for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_toi: Real,
        exclude: RigidBodyHandle,
    ) -> Option<RayHit> {
        let ray = Ray::new(origin, dir);
        let filter = QueryFilter::default().exclude_rigid_body(exclude);

        let (collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_toi,
            true,
            filter,
        )?;

        let point = ray.point_at(hit.time_of_impact);
        let ground_velocity = self
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .and_then(|parent| self.bodies.get(parent))
            .map(|body| body.velocity_at_point(&point))
            .unwrap_or_else(Vector::zeros);

        Some(RayHit {
            toi: hit.time_of_impact,
            point,
            normal: hit.normal,
            collider: Some(collider),
            ground_velocity,
        })
    }

    fn chassis_state(&self, handle: RigidBodyHandle) -> Option<ChassisState> {
        let body = self.bodies.get(handle)?;
        Some(ChassisState {
            pose: *body.position(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
            center_of_mass: *body.center_of_mass(),
            mass: body.mass(),
        })
    }

    fn impulse_denominator(
        &self,
        handle: RigidBodyHandle,
        point: Point<Real>,
        dir: Vector<Real>,
    ) -> Real {
        let Some(body) = self.bodies.get(handle) else {
            return 0.0;
        };
        let mprops = body.mass_properties();

        let dpt = point - body.center_of_mass();
        let gcross = dpt.cross(&dir);
        let v = (mprops.effective_world_inv_inertia_sqrt
            * (mprops.effective_world_inv_inertia_sqrt * gcross))
            .cross(&dpt);
        mprops.local_mprops.inv_mass + dir.dot(&v)
    }

    fn apply_impulse_at_point(
        &mut self,
        handle: RigidBodyHandle,
        impulse: Vector<Real>,
        point: Point<Real>,
    ) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse_at_point(impulse, point, true);
        }
    }
}
