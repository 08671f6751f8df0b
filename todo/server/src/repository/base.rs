use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PrimaryKeyTrait, QueryFilter, Select, sea_query::Condition,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Generic ORM repository for an entity `E` with an integer primary key.
///
/// This is the ORM tier every entity repository builds on. It works over any
/// connection type, so it can run against the pool or inside a transaction.
pub struct SeaOrmRepository<E, C> {
    db: Arc<C>,
    entity: PhantomData<fn() -> E>,
}

impl<E, C> SeaOrmRepository<E, C>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    pub fn new(db: Arc<C>) -> Self {
        Self {
            db,
            entity: PhantomData,
        }
    }

    /// Returns the connection the repository runs its queries on.
    pub fn connection(&self) -> &C {
        self.db.as_ref()
    }

    /// Starts a select over the entity, for queries the generic operations do not cover.
    pub fn select(&self) -> Select<E> {
        E::find()
    }

    pub async fn get_all(&self) -> Result<Vec<E::Model>, DbErr> {
        E::find().all(self.connection()).await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<E::Model>, DbErr> {
        E::find_by_id(id).one(self.connection()).await
    }

    /// Returns the rows matching `condition`, evaluated by the database.
    pub async fn find_by(&self, condition: Condition) -> Result<Vec<E::Model>, DbErr> {
        E::find().filter(condition).all(self.connection()).await
    }

    /// Inserts the active model and returns the stored row.
    pub async fn add<A>(&self, model: A) -> Result<E::Model, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        model.insert(self.connection()).await
    }

    /// Writes the changed columns of the active model.
    /// Returns `false` when no row has the model's primary key.
    pub async fn update<A>(&self, model: A) -> Result<bool, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        match model.update(self.connection()).await {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotUpdated) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Deletes the row with the given id. Returns `false` when there is none.
    pub async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = E::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }
}
